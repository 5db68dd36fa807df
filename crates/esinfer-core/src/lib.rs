//! esinfer-core: flow-sensitive type inference for a JavaScript-like
//! language.
//!
//! The engine consumes a parsed syntax tree ([`ast::Ast`]), extracts symbols
//! and scopes, builds a statement-level control flow graph (including
//! exception edges), and runs Hindley-Milner type inference as a work-list
//! fixpoint over that graph. The result is a type environment (symbol →
//! inferred type) at every control-flow point; provably incompatible types
//! abort the analysis with an error carrying the offending node.
//!
//! ```
//! use esinfer_core::ast::AstBuilder;
//! use esinfer_core::analyze;
//!
//! // let age = null; age = 10;
//! let mut b = AstBuilder::new();
//! let null = b.null();
//! let decl = b.let_declaration("age", Some(null));
//! let age = b.identifier("age");
//! let ten = b.number(10.0);
//! let assign = b.assignment(esinfer_core::ast::AssignmentOperator::Assign, age, ten);
//! let stmt = b.expression_statement(assign);
//! let program = b.program(vec![decl, stmt]);
//! let ast = b.finish(program);
//!
//! let analysis = analyze(ast).unwrap();
//! assert_eq!(analysis.exit_report().type_of("age"), Some("number"));
//! ```

pub mod ast;
pub mod cfg;
pub mod dataflow;
pub mod error;
pub mod infer;
pub mod program;
pub mod semantic;
pub mod types;

pub use error::{AnalysisError, CfgError, ExtractionError, TypeError, UnificationError};
pub use infer::{ForwardTypeInferenceAnalysis, TypeEnvironments};
pub use program::Program;
pub use types::{Type, TypeEnvironment, TypeReport};

/// The outcome of a full analysis run: the prepared program plus the
/// per-statement type environments (the `None` key is the exit environment).
#[derive(Debug)]
pub struct Analysis {
    pub program: Program,
    pub environments: TypeEnvironments,
}

impl Analysis {
    /// The environment at the program exit, if the program has one.
    pub fn exit_environment(&self) -> Option<&TypeEnvironment> {
        self.environments.get(&None)
    }

    /// The serializable form of the exit environment.
    pub fn exit_report(&self) -> TypeReport {
        self.exit_environment()
            .map(|environment| environment.report(self.program.symbols()))
            .unwrap_or(TypeReport {
                bindings: Vec::new(),
            })
    }
}

/// Prepares `ast` (symbol extraction, CFG construction) and runs the forward
/// type inference over the whole program.
pub fn analyze(ast: ast::Ast) -> anyhow::Result<Analysis> {
    let program = Program::prepare(ast)?;
    let environments = {
        let analysis = ForwardTypeInferenceAnalysis::new(&program);
        analysis.analyse_program()?
    };
    Ok(Analysis {
        program,
        environments,
    })
}

//! The forward type inference analysis: hoisting, then a work-list fixpoint
//! over the CFG where each transfer refines one statement.
//!
//! Refinement rules may re-enter [`ForwardTypeInferenceAnalysis::analyse_from`]
//! for nested function bodies; a callee's fixpoint always resolves completely
//! before the caller's transfer step finishes.

use indexmap::IndexMap;
use tracing::debug;

use crate::ast::{NodeId, NodeKind};
use crate::cfg::CfgValue;
use crate::dataflow::{DataFlowAnalysis, WorkListSolver};
use crate::error::TypeError;
use crate::infer::context::InferenceContext;
use crate::infer::engine::HindleyMilner;
use crate::infer::rules::functions;
use crate::program::Program;
use crate::semantic::builtins::default_type_environment;
use crate::types::{Type, TypeEnvironment};

/// Per-statement type environments produced by a run of the analysis, keyed
/// by statement node; the `None` key holds the exit environment.
pub type TypeEnvironments = IndexMap<CfgValue, TypeEnvironment>;

/// Flow-sensitive forward type inference over a prepared program.
pub struct ForwardTypeInferenceAnalysis<'a> {
    program: &'a Program,
    engine: HindleyMilner,
}

impl<'a> ForwardTypeInferenceAnalysis<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self {
            program,
            engine: HindleyMilner::new(),
        }
    }

    pub fn program(&self) -> &'a Program {
        self.program
    }

    /// The start environment: the built-in globals.
    pub fn default_environment(&self) -> TypeEnvironment {
        default_type_environment(self.program.scopes(), TypeEnvironment::new())
    }

    /// Analyzes the whole program: function declarations are hoisted (their
    /// base types enter the environment up front), then the fixpoint runs
    /// from the first non-empty top-level statement to the program exit.
    pub fn analyse_program(&self) -> Result<TypeEnvironments, TypeError> {
        let environment = self.hoist_function_declarations(self.default_environment())?;

        let body = match self.program.ast().kind(self.program.ast().root()) {
            NodeKind::Program { body } => body,
            _ => return Ok(TypeEnvironments::new()),
        };
        let first = body
            .iter()
            .copied()
            .find(|&node| !matches!(self.program.ast().kind(node), NodeKind::EmptyStatement));

        match first {
            Some(first) => self.analyse_from(first, environment),
            None => Ok(TypeEnvironments::new()),
        }
    }

    /// Runs the fixpoint from `node` to the exit with the given start
    /// environment.
    pub fn analyse_from(
        &self,
        node: NodeId,
        environment: TypeEnvironment,
    ) -> Result<TypeEnvironments, TypeError> {
        debug!(start = node.0, "type inference fixpoint");
        let dataflow = HindleyMilnerDataFlow {
            analysis: self,
            initial: environment,
        };
        WorkListSolver::solve(&dataflow, self.program.cfg(), Some(Some(node)))
    }

    pub(crate) fn infer(
        &self,
        node: NodeId,
        ctx: &mut InferenceContext<'_>,
    ) -> Result<Type, TypeError> {
        self.engine.infer(node, ctx)
    }

    pub(crate) fn unify(
        &self,
        t1: &Type,
        t2: &Type,
        node: NodeId,
        ctx: &mut InferenceContext<'_>,
    ) -> Result<Type, TypeError> {
        self.engine.unify(t1, t2, node, ctx)
    }

    /// Joins branch environments by unifying their conflicting mappings.
    pub fn join_environments(
        &self,
        head: TypeEnvironment,
        others: Vec<TypeEnvironment>,
        node: Option<NodeId>,
    ) -> Result<TypeEnvironment, TypeError> {
        let mut ctx = InferenceContext::new(self, head);
        let at = node.unwrap_or_else(|| self.program.ast().root());
        self.engine.merge_environments(&others, at, &mut ctx)?;
        Ok(ctx.into_environment())
    }

    /// Assigns every function declaration its base type before the fixpoint
    /// starts — declarations are hoisted and callable before their lexical
    /// position.
    fn hoist_function_declarations(
        &self,
        environment: TypeEnvironment,
    ) -> Result<TypeEnvironment, TypeError> {
        let mut ctx = InferenceContext::new(self, environment);
        for node in self.program.ast().ids() {
            if matches!(
                self.program.ast().kind(node),
                NodeKind::FunctionDeclaration { .. }
            ) {
                functions::infer_function_type(node, &mut ctx)?;
            }
        }
        Ok(ctx.into_environment())
    }
}

/// Adapter wiring the Hindley-Milner engine into the generic work-list
/// solver: the lattice is the type environment, transfer refines one
/// statement, join merges environments.
struct HindleyMilnerDataFlow<'b, 'a> {
    analysis: &'b ForwardTypeInferenceAnalysis<'a>,
    initial: TypeEnvironment,
}

impl<'b, 'a> DataFlowAnalysis for HindleyMilnerDataFlow<'b, 'a> {
    type Lattice = TypeEnvironment;
    type Error = TypeError;

    fn empty_lattice(&self) -> TypeEnvironment {
        self.initial.clone()
    }

    fn transfer(
        &self,
        node: CfgValue,
        in_state: TypeEnvironment,
    ) -> Result<TypeEnvironment, TypeError> {
        match node {
            // The exit node passes its in state through.
            None => Ok(in_state),
            Some(statement) => {
                let mut ctx = InferenceContext::new(self.analysis, in_state);
                ctx.infer(statement)?;
                Ok(ctx.into_environment())
            }
        }
    }

    fn join_branches(
        &self,
        head: TypeEnvironment,
        tail: Vec<TypeEnvironment>,
        node: CfgValue,
    ) -> Result<TypeEnvironment, TypeError> {
        self.analysis.join_environments(head, tail, node)
    }

    fn states_equal(&self, first: &TypeEnvironment, second: &TypeEnvironment) -> bool {
        first == second
    }
}

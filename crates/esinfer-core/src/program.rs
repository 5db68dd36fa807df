//! The analyzed program: the AST plus all derived side tables.

use crate::ast::{Ast, NodeId};
use crate::cfg::{CfgBuilder, ControlFlowGraph};
use crate::error::AnalysisError;
use crate::semantic::builtins::declare_globals;
use crate::semantic::extractor::SymbolExtractor;
use crate::semantic::scope::ScopeTree;
use crate::semantic::symbol::SymbolId;
use crate::semantic::symbol_table::SymbolTable;

/// A program prepared for type inference: the syntax tree, the scope tree and
/// symbol table produced by extraction, and the control flow graph.
#[derive(Debug)]
pub struct Program {
    ast: Ast,
    scopes: ScopeTree,
    symbols: SymbolTable,
    cfg: ControlFlowGraph,
}

impl Program {
    /// Runs symbol extraction and CFG construction over `ast`.
    pub fn prepare(ast: Ast) -> Result<Program, AnalysisError> {
        let (scopes, symbols) = SymbolExtractor::run(&ast, |scopes, symbols| {
            declare_globals(scopes, symbols);
        })?;
        let cfg = CfgBuilder::build(&ast)?;
        Ok(Program {
            ast,
            scopes,
            symbols,
            cfg,
        })
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn cfg(&self) -> &ControlFlowGraph {
        &self.cfg
    }

    /// The symbol assigned to `node` during extraction.
    pub fn symbol_of(&self, node: NodeId) -> Option<SymbolId> {
        self.symbols.symbol_of(node)
    }

    /// Label for a CFG node, for graph rendering: the one-line form of the
    /// wrapped statement, or `"<end>"` for the exit node.
    pub fn cfg_label(&self, value: crate::cfg::CfgValue) -> String {
        match value {
            Some(node) => self.ast.pretty(node),
            None => "<end>".to_owned(),
        }
    }
}

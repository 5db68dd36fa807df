//! Refinement of variable declarations.

use crate::ast::{NodeId, NodeKind};
use crate::error::TypeError;
use crate::infer::context::InferenceContext;
use crate::infer::rules::RefinementRule;
use crate::types::Type;

/// `let x = init` binds the declared symbol to a fresh copy of the
/// initializer's type; without an initializer the variable is undefined.
/// The fresh copy breaks the identity link: later rewrites of the
/// initializer's value do not retroactively change the binding.
pub struct VariableDeclarationRefinementRule;

impl VariableDeclarationRefinementRule {
    fn refine_declarator(
        &self,
        node: NodeId,
        ctx: &mut InferenceContext<'_>,
    ) -> Result<Type, TypeError> {
        let (id, init) = match ctx.program().ast().kind(node) {
            NodeKind::VariableDeclarator { id, init } => (*id, *init),
            _ => unreachable!("refine_declarator expects a declarator"),
        };

        let variable_type = match init {
            Some(init) => ctx.infer(init)?.fresh(),
            None => Type::Void,
        };

        let symbol = ctx
            .symbol_of(id)
            .expect("extraction declares every declarator");
        ctx.set_type(symbol, variable_type.clone());
        Ok(variable_type)
    }
}

impl RefinementRule for VariableDeclarationRefinementRule {
    fn name(&self) -> &'static str {
        "VariableDeclarationRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(
            kind,
            NodeKind::VariableDeclaration { .. } | NodeKind::VariableDeclarator { .. }
        )
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        match ctx.program().ast().kind(node) {
            NodeKind::VariableDeclaration { declarations, .. } => {
                for declarator in declarations.clone() {
                    self.refine_declarator(declarator, ctx)?;
                }
                Ok(Type::Void)
            }
            NodeKind::VariableDeclarator { .. } => self.refine_declarator(node, ctx),
            _ => unreachable!("can_refine admitted the node"),
        }
    }
}

//! Refinement of identifier and `this` uses.

use crate::ast::{NodeId, NodeKind};
use crate::error::TypeError;
use crate::infer::context::InferenceContext;
use crate::infer::rules::RefinementRule;
use crate::types::Type;

/// An identifier resolves through its symbol to the type recorded in the
/// environment. `undefined` is a keyword in all but name and types as void.
/// A symbol without a type is being used before its declaration.
pub struct IdentifierRefinementRule;

impl RefinementRule for IdentifierRefinementRule {
    fn name(&self) -> &'static str {
        "IdentifierRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(kind, NodeKind::Identifier { .. })
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        let name = match ctx.program().ast().kind(node) {
            NodeKind::Identifier { name } => name.clone(),
            _ => unreachable!("can_refine admitted the node"),
        };
        if name == "undefined" {
            return Ok(Type::Void);
        }

        let symbol = ctx
            .symbol_of(node)
            .ok_or_else(|| TypeError::UsedBeforeDeclaration {
                name: name.clone(),
                node,
            })?;
        ctx.get_type(symbol)
            .ok_or(TypeError::UsedBeforeDeclaration { name, node })
    }
}

/// `this` resolves through the symbol bound in the enclosing function scope.
pub struct ThisExpressionRefinementRule;

impl RefinementRule for ThisExpressionRefinementRule {
    fn name(&self) -> &'static str {
        "ThisExpressionRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(kind, NodeKind::ThisExpression)
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        let symbol = ctx
            .symbol_of(node)
            .ok_or(TypeError::ThisOutsideFunction { node })?;
        ctx.get_type(symbol)
            .ok_or(TypeError::ThisOutsideFunction { node })
    }
}

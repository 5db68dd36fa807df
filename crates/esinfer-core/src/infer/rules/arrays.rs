//! Refinement of array literals.

use crate::ast::{NodeId, NodeKind};
use crate::error::TypeError;
use crate::infer::context::InferenceContext;
use crate::infer::rules::RefinementRule;
use crate::types::Type;

/// An array literal's element type is the unification of all element types,
/// starting from a fresh variable for the empty array. Elements that do not
/// unify (e.g. numbers mixed with strings) widen the array to `any[]`.
pub struct ArrayExpressionRefinementRule;

impl RefinementRule for ArrayExpressionRefinementRule {
    fn name(&self) -> &'static str {
        "ArrayExpressionRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(kind, NodeKind::ArrayExpression { .. })
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        let elements = match ctx.program().ast().kind(node) {
            NodeKind::ArrayExpression { elements } => elements.clone(),
            _ => unreachable!("can_refine admitted the node"),
        };

        let mut element_type = Type::variable();
        for element in elements {
            let ty = ctx.infer(element)?;
            element_type = match ctx.unify(&ty, &element_type, element) {
                Ok(unified) => unified,
                Err(error) if error.is_not_unifiable() => Type::Any,
                Err(error) => return Err(error),
            };
        }

        Ok(Type::array(element_type))
    }
}

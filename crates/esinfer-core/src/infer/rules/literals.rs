//! Refinement of literals.

use crate::ast::{NodeId, NodeKind};
use crate::error::TypeError;
use crate::infer::context::InferenceContext;
use crate::infer::rules::RefinementRule;
use crate::types::Type;

/// Number, string, boolean and null literals.
pub struct LiteralRefinementRule;

impl RefinementRule for LiteralRefinementRule {
    fn name(&self) -> &'static str {
        "LiteralRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(
            kind,
            NodeKind::NumberLiteral { .. }
                | NodeKind::StringLiteral { .. }
                | NodeKind::BooleanLiteral { .. }
                | NodeKind::NullLiteral
        )
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        Ok(match ctx.program().ast().kind(node) {
            NodeKind::NumberLiteral { .. } => Type::Number,
            NodeKind::StringLiteral { .. } => Type::String,
            NodeKind::BooleanLiteral { .. } => Type::Boolean,
            NodeKind::NullLiteral => Type::Null,
            _ => unreachable!("can_refine admitted the node"),
        })
    }
}

/// Template literals evaluate to a string; the embedded expressions are still
/// inferred for their side effects on the environment.
pub struct TemplateLiteralRefinementRule;

impl RefinementRule for TemplateLiteralRefinementRule {
    fn name(&self) -> &'static str {
        "TemplateLiteralRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(kind, NodeKind::TemplateLiteral { .. })
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        let expressions = match ctx.program().ast().kind(node) {
            NodeKind::TemplateLiteral { expressions, .. } => expressions.clone(),
            _ => unreachable!("can_refine admitted the node"),
        };
        for expression in expressions {
            ctx.infer(expression)?;
        }
        Ok(Type::String)
    }
}

//! Refinement of object literals and member accesses.

use crate::ast::{NodeId, NodeKind};
use crate::error::TypeError;
use crate::infer::context::InferenceContext;
use crate::infer::rules::RefinementRule;
use crate::types::Type;

/// An object literal becomes a record with one property per literal entry.
pub struct ObjectExpressionRefinementRule;

impl RefinementRule for ObjectExpressionRefinementRule {
    fn name(&self) -> &'static str {
        "ObjectExpressionRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(kind, NodeKind::ObjectExpression { .. })
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        let property_nodes = match ctx.program().ast().kind(node) {
            NodeKind::ObjectExpression { properties } => properties.clone(),
            _ => unreachable!("can_refine admitted the node"),
        };

        let mut properties = Vec::with_capacity(property_nodes.len());
        for property in property_nodes {
            let value = match ctx.program().ast().kind(property) {
                NodeKind::ObjectProperty { value, .. } => *value,
                _ => unreachable!("object expressions contain only properties"),
            };
            let symbol = ctx
                .symbol_of(property)
                .expect("extraction declares every object property");
            let ty = ctx.infer(value)?;
            properties.push((ctx.program().symbols().name(symbol), ty));
        }

        Ok(Type::record(properties))
    }
}

/// A member access resolves the object to a record-like type and looks the
/// property up. Reading a property that does not exist is fine — the value is
/// just undefined; record structure only changes through assignments.
pub struct MemberExpressionRefinementRule;

impl RefinementRule for MemberExpressionRefinementRule {
    fn name(&self) -> &'static str {
        "MemberExpressionRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(kind, NodeKind::MemberExpression { .. })
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        let property = match ctx.program().ast().kind(node) {
            NodeKind::MemberExpression { property, .. } => *property,
            _ => unreachable!("can_refine admitted the node"),
        };

        let object_type = ctx.object_type(node)?;
        if matches!(object_type, Type::Any) {
            return Ok(Type::Any);
        }

        let symbol = ctx
            .symbol_of(property)
            .expect("extraction assigns every member a symbol");
        let name = ctx.program().symbols().name(symbol);
        let computed = ctx.program().symbols().flags(symbol).is_computed();

        Ok(object_type
            .property_type(&name, computed)
            .unwrap_or(Type::Void))
    }
}

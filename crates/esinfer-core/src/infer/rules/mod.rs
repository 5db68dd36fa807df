//! Refinement rules: one rule per AST node shape.
//!
//! The registry is a fixed list built at engine construction. Dispatch
//! requires exactly one matching rule per node — zero means the construct is
//! not modeled yet, more than one is a defect in the rule set; both abort the
//! analysis.

mod arrays;
mod calls;
mod declarations;
pub(crate) mod functions;
mod identifiers;
mod literals;
mod objects;
mod operators;
mod statements;

use crate::ast::{NodeId, NodeKind};
use crate::error::TypeError;
use crate::infer::context::InferenceContext;
use crate::types::Type;

/// A refinement rule for one family of node shapes.
pub trait RefinementRule {
    fn name(&self) -> &'static str;

    /// True if this rule handles the node shape.
    fn can_refine(&self, kind: &NodeKind) -> bool;

    /// Infers the type of `node`, possibly recursing into sub-expressions
    /// and nested control flow graphs through the context.
    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError>;
}

/// The complete rule set, in registration order.
pub fn default_rules() -> Vec<Box<dyn RefinementRule>> {
    vec![
        Box::new(literals::LiteralRefinementRule),
        Box::new(literals::TemplateLiteralRefinementRule),
        Box::new(identifiers::IdentifierRefinementRule),
        Box::new(identifiers::ThisExpressionRefinementRule),
        Box::new(declarations::VariableDeclarationRefinementRule),
        Box::new(functions::FunctionRefinementRule),
        Box::new(arrays::ArrayExpressionRefinementRule),
        Box::new(objects::ObjectExpressionRefinementRule),
        Box::new(objects::MemberExpressionRefinementRule),
        Box::new(calls::CallExpressionRefinementRule::new()),
        Box::new(operators::AssignmentExpressionRefinementRule),
        Box::new(operators::BinaryExpressionRefinementRule),
        Box::new(operators::LogicalExpressionRefinementRule),
        Box::new(operators::UnaryExpressionRefinementRule),
        Box::new(operators::UpdateExpressionRefinementRule),
        Box::new(operators::ConditionalExpressionRefinementRule),
        Box::new(operators::SequenceExpressionRefinementRule),
        Box::new(statements::ExpressionStatementRefinementRule),
        Box::new(statements::BlockStatementRefinementRule),
        Box::new(statements::IfStatementRefinementRule),
        Box::new(statements::WhileStatementRefinementRule),
        Box::new(statements::ForStatementRefinementRule),
        Box::new(statements::ForOfStatementRefinementRule),
        Box::new(statements::SwitchRefinementRule),
        Box::new(statements::ReturnStatementRefinementRule),
        Box::new(statements::ControlTransferRefinementRule),
        Box::new(statements::ThrowStatementRefinementRule),
        Box::new(statements::TryRefinementRule),
    ]
}

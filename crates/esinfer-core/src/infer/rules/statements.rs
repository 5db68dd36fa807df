//! Refinement of statements.
//!
//! Statements type as `undefined`; their job is to refine the environment
//! through the expressions they contain. Branching itself is the work-list
//! analysis' concern — an `if` statement only infers its test.

use crate::ast::{NodeId, NodeKind};
use crate::error::TypeError;
use crate::infer::context::InferenceContext;
use crate::infer::rules::RefinementRule;
use crate::semantic::symbol::SymbolId;
use crate::types::Type;

pub struct ExpressionStatementRefinementRule;

impl RefinementRule for ExpressionStatementRefinementRule {
    fn name(&self) -> &'static str {
        "ExpressionStatementRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(kind, NodeKind::ExpressionStatement { .. })
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        let expression = match ctx.program().ast().kind(node) {
            NodeKind::ExpressionStatement { expression } => *expression,
            _ => unreachable!("can_refine admitted the node"),
        };
        ctx.infer(expression)?;
        Ok(Type::Void)
    }
}

pub struct BlockStatementRefinementRule;

impl RefinementRule for BlockStatementRefinementRule {
    fn name(&self) -> &'static str {
        "BlockStatementRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(kind, NodeKind::BlockStatement { .. })
    }

    fn refine(&self, _node: NodeId, _ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        Ok(Type::Void)
    }
}

pub struct IfStatementRefinementRule;

impl RefinementRule for IfStatementRefinementRule {
    fn name(&self) -> &'static str {
        "IfStatementRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(kind, NodeKind::IfStatement { .. })
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        let test = match ctx.program().ast().kind(node) {
            NodeKind::IfStatement { test, .. } => *test,
            _ => unreachable!("can_refine admitted the node"),
        };
        ctx.infer(test)?;
        Ok(Type::Void)
    }
}

/// `while` and `do-while`: the loop condition is refined; the body flows
/// through the CFG.
pub struct WhileStatementRefinementRule;

impl RefinementRule for WhileStatementRefinementRule {
    fn name(&self) -> &'static str {
        "WhileStatementRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(
            kind,
            NodeKind::WhileStatement { .. } | NodeKind::DoWhileStatement { .. }
        )
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        let test = match ctx.program().ast().kind(node) {
            NodeKind::WhileStatement { test, .. } | NodeKind::DoWhileStatement { test, .. } => {
                *test
            }
            _ => unreachable!("can_refine admitted the node"),
        };
        ctx.infer(test)?;
        Ok(Type::Void)
    }
}

pub struct ForStatementRefinementRule;

impl RefinementRule for ForStatementRefinementRule {
    fn name(&self) -> &'static str {
        "ForStatementRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(kind, NodeKind::ForStatement { .. })
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        let (init, test, update) = match ctx.program().ast().kind(node) {
            NodeKind::ForStatement {
                init, test, update, ..
            } => (*init, *test, *update),
            _ => unreachable!("can_refine admitted the node"),
        };
        if let Some(init) = init {
            ctx.infer(init)?;
        }
        if let Some(test) = test {
            ctx.infer(test)?;
        }
        if let Some(update) = update {
            ctx.infer(update)?;
        }
        Ok(Type::Void)
    }
}

/// `for (x of xs)` requires an array on the right and binds the loop variable
/// to the element type.
pub struct ForOfStatementRefinementRule;

impl RefinementRule for ForOfStatementRefinementRule {
    fn name(&self) -> &'static str {
        "ForOfStatementRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(kind, NodeKind::ForOfStatement { .. })
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        let (left, right) = match ctx.program().ast().kind(node) {
            NodeKind::ForOfStatement { left, right, .. } => (*left, *right),
            _ => unreachable!("can_refine admitted the node"),
        };

        ctx.infer(left)?;
        let right_type = ctx.infer(right)?;

        let element = match &right_type {
            Type::Array { of, .. } => (**of).clone(),
            _ => {
                return Err(TypeError::NotIterable {
                    ty: right_type,
                    node: right,
                })
            }
        };

        let target = loop_target(left, ctx);
        if let Some(symbol) = target {
            ctx.set_type(symbol, element);
        }
        Ok(Type::Void)
    }
}

/// The symbol a for-of left-hand side binds: the single declarator of a
/// declaration, or the target identifier.
fn loop_target(left: NodeId, ctx: &InferenceContext<'_>) -> Option<SymbolId> {
    match ctx.program().ast().kind(left) {
        NodeKind::VariableDeclaration { declarations, .. } => {
            let declarator = declarations.first()?;
            match ctx.program().ast().kind(*declarator) {
                NodeKind::VariableDeclarator { id, .. } => ctx.symbol_of(*id),
                _ => None,
            }
        }
        _ => ctx.symbol_of(left),
    }
}

/// `switch` infers its discriminant; each `case` infers its test.
pub struct SwitchRefinementRule;

impl RefinementRule for SwitchRefinementRule {
    fn name(&self) -> &'static str {
        "SwitchRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(
            kind,
            NodeKind::SwitchStatement { .. } | NodeKind::SwitchCase { .. }
        )
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        match ctx.program().ast().kind(node) {
            NodeKind::SwitchStatement { discriminant, .. } => {
                let discriminant = *discriminant;
                ctx.infer(discriminant)?;
            }
            NodeKind::SwitchCase { test, .. } => {
                if let Some(test) = *test {
                    ctx.infer(test)?;
                }
            }
            _ => unreachable!("can_refine admitted the node"),
        }
        Ok(Type::Void)
    }
}

/// A return statement unifies its argument with the function's return
/// binding.
pub struct ReturnStatementRefinementRule;

impl RefinementRule for ReturnStatementRefinementRule {
    fn name(&self) -> &'static str {
        "ReturnStatementRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(kind, NodeKind::ReturnStatement { .. })
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        let argument = match ctx.program().ast().kind(node) {
            NodeKind::ReturnStatement { argument } => *argument,
            _ => unreachable!("can_refine admitted the node"),
        };

        let mut argument_type = match argument {
            Some(argument) => ctx.infer(argument)?,
            None => Type::Void,
        };

        if let Some(return_type) = ctx.get_type(SymbolId::RETURN) {
            argument_type = ctx.unify(&return_type, &argument_type, node)?;
        }
        ctx.set_type(SymbolId::RETURN, argument_type);
        Ok(Type::Void)
    }
}

/// `break` and `continue` transfer control without touching any types.
pub struct ControlTransferRefinementRule;

impl RefinementRule for ControlTransferRefinementRule {
    fn name(&self) -> &'static str {
        "ControlTransferRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(
            kind,
            NodeKind::BreakStatement { .. } | NodeKind::ContinueStatement { .. }
        )
    }

    fn refine(&self, _node: NodeId, _ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        Ok(Type::Void)
    }
}

pub struct ThrowStatementRefinementRule;

impl RefinementRule for ThrowStatementRefinementRule {
    fn name(&self) -> &'static str {
        "ThrowStatementRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(kind, NodeKind::ThrowStatement { .. })
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        let argument = match ctx.program().ast().kind(node) {
            NodeKind::ThrowStatement { argument } => *argument,
            _ => unreachable!("can_refine admitted the node"),
        };
        ctx.infer(argument)?;
        Ok(Type::Void)
    }
}

/// `try` carries no typing of its own; a catch clause binds its parameter to
/// `any` — the thrown value's type is not tracked.
pub struct TryRefinementRule;

impl RefinementRule for TryRefinementRule {
    fn name(&self) -> &'static str {
        "TryRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(
            kind,
            NodeKind::TryStatement { .. } | NodeKind::CatchClause { .. }
        )
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        if let NodeKind::CatchClause {
            param: Some(param), ..
        } = ctx.program().ast().kind(node)
        {
            let param = *param;
            if let Some(symbol) = ctx.symbol_of(param) {
                ctx.set_type(symbol, Type::Any);
            }
        }
        Ok(Type::Void)
    }
}

//! Refinement of function declarations, function expressions and arrow
//! functions.

use std::sync::Arc;

use crate::ast::{Ast, NodeId, NodeKind};
use crate::cfg::Branch;
use crate::error::TypeError;
use crate::infer::context::InferenceContext;
use crate::infer::rules::RefinementRule;
use crate::types::Type;

/// Produces the function's type. Function declarations were already typed by
/// the hoisting pass; re-deriving the type here would mint new type variables
/// on every fixpoint round and the analysis would never stabilize, so the
/// recorded type is reused. Each time the function is seen as a value, the
/// current environment snapshot is attached for closure calls.
pub struct FunctionRefinementRule;

impl RefinementRule for FunctionRefinementRule {
    fn name(&self) -> &'static str {
        "FunctionRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        kind.is_function()
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        let symbol = ctx
            .symbol_of(node)
            .expect("extraction assigns every function a symbol");

        let ty = match ctx.get_type(symbol) {
            Some(existing) => existing,
            None => infer_function_type(node, ctx)?,
        };

        let with_env = ty.with_env(Arc::new(ctx.environment().clone()));
        ctx.set_type(symbol, with_env.clone());
        Ok(with_env)
    }
}

/// Derives the base type of a function: fresh type variables for `this` and
/// every parameter, and a return type that is a variable when every
/// non-exception exit of the body is a return statement (or the body is a
/// bare expression), undefined otherwise.
pub fn infer_function_type(
    node: NodeId,
    ctx: &mut InferenceContext<'_>,
) -> Result<Type, TypeError> {
    let ast = ctx.program().ast();
    let (params, body, expression_body) = match ast.kind(node) {
        NodeKind::FunctionDeclaration { params, body, .. }
        | NodeKind::FunctionExpression { params, body, .. } => (params.len(), *body, false),
        NodeKind::ArrowFunctionExpression {
            params,
            body,
            expression,
        } => (params.len(), *body, *expression),
        _ => unreachable!("infer_function_type expects a function node"),
    };

    let return_type = if expression_body || all_exits_return(ast, ctx, body) {
        Type::variable()
    } else {
        Type::Void
    };
    let parameter_types: Vec<Type> = (0..params).map(|_| Type::variable()).collect();
    let ty = Type::declared_function(Type::variable(), parameter_types, return_type, node);

    let symbol = ctx
        .symbol_of(node)
        .expect("extraction assigns every function a symbol");
    ctx.set_type(symbol, ty.clone());
    Ok(ty)
}

/// True when every non-exception edge from the body into the exit node
/// leaves from a return statement (and at least one exit exists).
fn all_exits_return(ast: &Ast, ctx: &InferenceContext<'_>, body: NodeId) -> bool {
    let exits = ctx.program().cfg().exit_edges(Some(body));
    if exits.is_empty() {
        return false;
    }
    exits.iter().all(|edge| {
        edge.branch == Branch::Exception
            || edge
                .from
                .is_some_and(|from| matches!(ast.kind(from), NodeKind::ReturnStatement { .. }))
    })
}

//! Successor and fall-through computation over the AST.
//!
//! The successor of a statement is the statement executed after it — which
//! may be an earlier node (loop back edges). The fall-through of a node is
//! its effective entry point: a `for` statement is entered through its init
//! clause, a `do-while` through its body, a labeled statement through its
//! target.

use crate::ast::{Ast, NodeId, NodeKind};
use crate::error::CfgError;

/// The effective entry point of `node`.
pub fn compute_fallthrough(ast: &Ast, node: NodeId) -> NodeId {
    match ast.kind(node) {
        NodeKind::ForStatement {
            init: Some(init), ..
        } => compute_fallthrough(ast, *init),
        NodeKind::DoWhileStatement { body, .. } => compute_fallthrough(ast, *body),
        NodeKind::LabeledStatement { body, .. } => compute_fallthrough(ast, *body),
        _ => node,
    }
}

/// The statement executed after `node`, or `None` when the next step is the
/// end of the program or of the enclosing function body.
pub fn compute_successor(ast: &Ast, node: NodeId) -> Result<Option<NodeId>, CfgError> {
    if let Some(parent) = ast.parent(node) {
        match ast.kind(parent) {
            // The body of a while/do-while loops back to the loop header.
            NodeKind::WhileStatement { .. } | NodeKind::DoWhileStatement { .. } => {
                return Ok(Some(parent));
            }
            NodeKind::ForStatement { update, body, .. } if *body == node => {
                // After the body: the update clause if present, else the header.
                return Ok(Some(update.unwrap_or(parent)));
            }
            NodeKind::TryStatement {
                finalizer: Some(finalizer),
                ..
            } if *finalizer != node => {
                return Ok(Some(*finalizer));
            }
            kind if kind.is_function() => {
                // The last statement of a function body runs into the exit.
                if function_body(kind) == Some(node) {
                    return Ok(None);
                }
            }
            _ => {}
        }
    }

    match ast.kind(node) {
        NodeKind::BreakStatement { label } => {
            return compute_break_successor(ast, node, label.as_deref());
        }
        NodeKind::ContinueStatement { label } => {
            return compute_continue_successor(ast, node, label.as_deref());
        }
        NodeKind::SwitchCase { .. } => {
            // A case without a break falls through into the next non-empty
            // consequent.
            if let Some(consequent) = next_consequent_for_case(ast, node) {
                return Ok(Some(consequent));
            }
        }
        NodeKind::Program { .. } => return Ok(None),
        _ => {}
    }

    // Default: the next sibling, skipping empty statements; with no sibling
    // left, continue on the enclosing level.
    let mut sibling = ast.next_sibling(node);
    while let Some(current) = sibling {
        if matches!(ast.kind(current), NodeKind::EmptyStatement) {
            sibling = ast.next_sibling(current);
        } else {
            return Ok(Some(compute_fallthrough(ast, current)));
        }
    }

    match ast.parent(node) {
        Some(parent) => compute_successor(ast, parent),
        None => Ok(None),
    }
}

/// A break jumps to the successor of the loop, switch, or labeled statement
/// it targets.
fn compute_break_successor(
    ast: &Ast,
    node: NodeId,
    label: Option<&str>,
) -> Result<Option<NodeId>, CfgError> {
    let mut parent = ast.parent(node);
    while let Some(current) = parent {
        match (label, ast.kind(current)) {
            (Some(wanted), NodeKind::LabeledStatement { label: found, .. }) if wanted == found => {
                break
            }
            (None, kind) if kind.is_loop() || matches!(kind, NodeKind::SwitchStatement { .. }) => {
                break
            }
            (_, NodeKind::TryStatement { finalizer, .. }) if finalizer.is_some() => {
                return Err(CfgError::BreakInFinally { node });
            }
            _ => parent = ast.parent(current),
        }
    }

    match parent {
        Some(target) => compute_successor(ast, target),
        None => Ok(None),
    }
}

/// A continue jumps back to the loop header itself.
fn compute_continue_successor(
    ast: &Ast,
    node: NodeId,
    label: Option<&str>,
) -> Result<Option<NodeId>, CfgError> {
    let mut parent = ast.parent(node);
    while let Some(current) = parent {
        if ast.kind(current).is_loop() {
            match label {
                None => return Ok(Some(current)),
                Some(wanted) => {
                    let labeled = ast.parent(current).is_some_and(|grandparent| {
                        matches!(
                            ast.kind(grandparent),
                            NodeKind::LabeledStatement { label: found, .. } if found == wanted
                        )
                    });
                    if labeled {
                        return Ok(Some(current));
                    }
                }
            }
        }

        if let NodeKind::TryStatement {
            finalizer: Some(_), ..
        } = ast.kind(current)
        {
            return Err(CfgError::ContinueInFinally { node });
        }

        parent = ast.parent(current);
    }

    Err(CfgError::MissingContinueTarget { node })
}

/// The first consequent statement of any case following `case_node`; cases
/// without consequents cascade.
pub(crate) fn next_consequent_for_case(ast: &Ast, case_node: NodeId) -> Option<NodeId> {
    let mut case = ast.next_sibling(case_node);
    while let Some(current) = case {
        if let NodeKind::SwitchCase { consequent, .. } = ast.kind(current) {
            if let Some(first) = consequent.first() {
                return Some(*first);
            }
        }
        case = ast.next_sibling(current);
    }
    None
}

fn function_body(kind: &NodeKind) -> Option<NodeId> {
    match kind {
        NodeKind::FunctionDeclaration { body, .. }
        | NodeKind::FunctionExpression { body, .. }
        | NodeKind::ArrowFunctionExpression { body, .. } => Some(*body),
        _ => None,
    }
}

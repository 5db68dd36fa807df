//! CFG construction: one pass over the AST that connects statement nodes.
//!
//! Expressions never become CFG nodes. Functions push a fresh exception
//! handler context so that statements inside a nested function do not link to
//! an outer `catch`.

use tracing::trace;

use crate::ast::{Ast, NodeId, NodeKind};
use crate::cfg::graph::{Branch, ControlFlowGraph};
use crate::cfg::successor::{compute_fallthrough, compute_successor, next_consequent_for_case};
use crate::error::CfgError;

/// The active exception handler for the statements currently being visited:
/// either a function/program boundary (exceptions leave the graph) or an
/// enclosing `catch` clause.
#[derive(Debug, Clone, Copy)]
enum Handler {
    Boundary(NodeId),
    Catch(NodeId),
}

pub struct CfgBuilder<'a> {
    ast: &'a Ast,
    cfg: ControlFlowGraph,
    exception_handlers: Vec<Handler>,
}

impl<'a> CfgBuilder<'a> {
    /// Builds the control flow graph for the whole program, including the
    /// bodies of all declared functions (their exits are the shared `None`
    /// node).
    pub fn build(ast: &'a Ast) -> Result<ControlFlowGraph, CfgError> {
        let mut builder = Self {
            ast,
            cfg: ControlFlowGraph::new(),
            exception_handlers: Vec::new(),
        };
        builder.visit(ast.root())?;
        Ok(builder.cfg)
    }

    fn visit(&mut self, node: NodeId) -> Result<(), CfgError> {
        match self.ast.kind(node) {
            NodeKind::Program { .. } => {
                self.exception_handlers.push(Handler::Boundary(node));
                self.visit_children(node)?;
                self.exception_handlers.pop();
            }

            NodeKind::EmptyStatement | NodeKind::LabeledStatement { .. } => {
                // No node of their own; a label's body is handled on its own.
                self.visit_children(node)?;
            }

            NodeKind::BlockStatement { body } => {
                self.cfg.create_node(Some(node));
                match body.first() {
                    Some(first) => {
                        let entry = compute_fallthrough(self.ast, *first);
                        self.cfg
                            .connect_if_not_found(Some(node), Branch::Unconditional, Some(entry));
                    }
                    None => {
                        let successor = compute_successor(self.ast, node)?;
                        self.cfg
                            .connect_if_not_found(Some(node), Branch::Unconditional, successor);
                    }
                }
                self.visit_children(node)?;
            }

            NodeKind::ExpressionStatement { .. }
            | NodeKind::BreakStatement { .. }
            | NodeKind::ContinueStatement { .. } => {
                self.connect_with_successor(node)?;
                self.visit_children(node)?;
            }

            NodeKind::VariableDeclaration { .. } => {
                // Declarations inside a for-loop head are part of the loop
                // statement and get no node of their own.
                if self.ast.is_statement(node) {
                    self.connect_with_successor(node)?;
                }
                self.visit_children(node)?;
            }

            NodeKind::IfStatement {
                consequent,
                alternate,
                ..
            } => {
                self.cfg.create_node(Some(node));
                let consequent_entry = compute_fallthrough(self.ast, *consequent);
                self.cfg
                    .connect_if_not_found(Some(node), Branch::True, Some(consequent_entry));

                match alternate {
                    Some(alternate) => {
                        let alternate_entry = compute_fallthrough(self.ast, *alternate);
                        self.cfg.connect_if_not_found(
                            Some(node),
                            Branch::False,
                            Some(alternate_entry),
                        );
                    }
                    None => {
                        let successor = compute_successor(self.ast, node)?;
                        self.cfg
                            .connect_if_not_found(Some(node), Branch::False, successor);
                    }
                }

                self.connect_with_exception_handler(node);
                self.visit_children(node)?;
            }

            NodeKind::SwitchStatement { cases, .. } => {
                self.cfg.create_node(Some(node));
                // The default clause is evaluated last even when it is
                // written first, so the switch enters at the first
                // case-labeled clause when one exists.
                let entry_case = match cases.first() {
                    Some(first) => {
                        let first_is_default =
                            matches!(self.ast.kind(*first), NodeKind::SwitchCase { test: None, .. });
                        if first_is_default && cases.len() > 1 {
                            Some(cases[1])
                        } else {
                            Some(*first)
                        }
                    }
                    None => None,
                };
                match entry_case {
                    Some(case) => {
                        let entry = compute_fallthrough(self.ast, case);
                        self.cfg
                            .connect_if_not_found(Some(node), Branch::Unconditional, Some(entry));
                    }
                    None => {
                        let successor = compute_successor(self.ast, node)?;
                        self.cfg
                            .connect_if_not_found(Some(node), Branch::Unconditional, successor);
                    }
                }
                self.connect_with_exception_handler(node);
                self.visit_children(node)?;
            }

            NodeKind::SwitchCase { test, consequent } => {
                self.cfg.create_node(Some(node));
                let switch = self
                    .ast
                    .parent(node)
                    .expect("a switch case always sits in a switch");

                let true_branch = match self.consequent_for_case(node, consequent) {
                    Some(consequent) => Some(compute_fallthrough(self.ast, consequent)),
                    None => compute_successor(self.ast, switch)?,
                };

                if test.is_some() {
                    self.cfg
                        .connect_if_not_found(Some(node), Branch::True, true_branch);
                    let false_branch = match self.next_case(node) {
                        Some(next) => Some(next),
                        None => compute_successor(self.ast, switch)?,
                    };
                    self.cfg
                        .connect_if_not_found(Some(node), Branch::False, false_branch);
                } else {
                    self.cfg
                        .connect_if_not_found(Some(node), Branch::Unconditional, true_branch);
                }
                self.visit_children(node)?;
            }

            NodeKind::ReturnStatement { .. } => {
                if self.inside_try_with_finalizer(node) {
                    return Err(CfgError::ReturnInFinally { node });
                }
                self.cfg
                    .connect_if_not_found(Some(node), Branch::Unconditional, None);
                self.connect_with_exception_handler(node);
                self.visit_children(node)?;
            }

            NodeKind::TryStatement { block, handler, .. } => {
                self.cfg
                    .connect_if_not_found(Some(node), Branch::Unconditional, Some(*block));
                if let Some(handler) = handler {
                    self.exception_handlers.push(Handler::Catch(*handler));
                }
                self.visit_children(node)?;
            }

            NodeKind::CatchClause { body, .. } => {
                self.cfg
                    .connect_if_not_found(Some(node), Branch::Unconditional, Some(*body));
                // From here on the next outer handler is responsible.
                let popped = self.exception_handlers.pop();
                debug_assert!(
                    matches!(popped, Some(Handler::Catch(handler)) if handler == node),
                    "catch clause must be the innermost handler"
                );
                self.visit_children(node)?;
            }

            NodeKind::ThrowStatement { .. } => {
                let target = match self.exception_handlers.last() {
                    Some(Handler::Catch(handler)) => Some(*handler),
                    _ => None,
                };
                self.cfg
                    .connect_if_not_found(Some(node), Branch::Unconditional, target);
                self.visit_children(node)?;
            }

            NodeKind::WhileStatement { .. }
            | NodeKind::DoWhileStatement { .. }
            | NodeKind::ForInStatement { .. }
            | NodeKind::ForOfStatement { .. } => {
                self.connect_loop(node)?;
                self.visit_children(node)?;
            }

            NodeKind::ForStatement {
                init, test, update, body,
            } => {
                self.cfg.create_node(Some(node));

                if let Some(init) = init {
                    self.cfg
                        .connect_if_not_found(Some(*init), Branch::Unconditional, Some(node));
                }
                if test.is_some() {
                    let successor = compute_successor(self.ast, node)?;
                    self.cfg
                        .connect_if_not_found(Some(node), Branch::False, successor);
                }
                if let Some(update) = update {
                    self.cfg
                        .connect_if_not_found(Some(*update), Branch::Unconditional, Some(node));
                }

                let body_entry = compute_fallthrough(self.ast, *body);
                self.cfg
                    .connect_if_not_found(Some(node), Branch::True, Some(body_entry));
                self.connect_with_exception_handler(node);
                self.visit_children(node)?;
            }

            NodeKind::FunctionDeclaration { .. } => {
                self.exception_handlers.push(Handler::Boundary(node));
                let successor = compute_successor(self.ast, node)?;
                self.cfg
                    .connect_if_not_found(Some(node), Branch::Unconditional, successor);
                self.visit_children(node)?;
                self.exception_handlers.pop();
            }

            NodeKind::FunctionExpression { .. } => {
                self.exception_handlers.push(Handler::Boundary(node));
                self.visit_children(node)?;
                self.exception_handlers.pop();
            }

            NodeKind::ArrowFunctionExpression { body, .. } => {
                self.exception_handlers.push(Handler::Boundary(node));
                self.cfg
                    .connect_if_not_found(Some(*body), Branch::Unconditional, None);
                self.visit_children(node)?;
                self.exception_handlers.pop();
            }

            kind if kind.is_statement() => {
                return Err(CfgError::UnhandledStatement {
                    kind: kind.name(),
                    node,
                });
            }

            // Expressions: no CFG node, but function expressions nested
            // inside them still need their bodies wired.
            _ => self.visit_children(node)?,
        }
        Ok(())
    }

    fn visit_children(&mut self, node: NodeId) -> Result<(), CfgError> {
        for child in self.ast.children(node) {
            self.visit(child)?;
        }
        Ok(())
    }

    fn connect_loop(&mut self, node: NodeId) -> Result<(), CfgError> {
        self.cfg.create_node(Some(node));

        let body = match self.ast.kind(node) {
            NodeKind::WhileStatement { body, .. }
            | NodeKind::DoWhileStatement { body, .. }
            | NodeKind::ForInStatement { body, .. }
            | NodeKind::ForOfStatement { body, .. } => *body,
            _ => unreachable!("connect_loop on a non-loop node"),
        };

        let body_entry = compute_fallthrough(self.ast, body);
        self.cfg
            .connect_if_not_found(Some(node), Branch::True, Some(body_entry));
        let successor = compute_successor(self.ast, node)?;
        self.cfg
            .connect_if_not_found(Some(node), Branch::False, successor);
        self.connect_with_exception_handler(node);
        Ok(())
    }

    fn connect_with_successor(&mut self, node: NodeId) -> Result<(), CfgError> {
        let successor = compute_successor(self.ast, node)?;
        trace!(node = node.0, ?successor, "connect statement");
        self.cfg
            .connect_if_not_found(Some(node), Branch::Unconditional, successor);
        self.connect_with_exception_handler(node);
        Ok(())
    }

    /// Statements that may throw get an `Exception` edge to the innermost
    /// enclosing catch clause, if one is active.
    fn connect_with_exception_handler(&mut self, node: NodeId) {
        if !may_throw(self.ast, node) {
            return;
        }
        if let Some(Handler::Catch(handler)) = self.exception_handlers.last() {
            self.cfg
                .connect_if_not_found(Some(node), Branch::Exception, Some(*handler));
        }
    }

    fn inside_try_with_finalizer(&self, node: NodeId) -> bool {
        let mut parent = self.ast.parent(node);
        while let Some(current) = parent {
            if let NodeKind::TryStatement {
                finalizer: Some(_), ..
            } = self.ast.kind(current)
            {
                return true;
            }
            parent = self.ast.parent(current);
        }
        false
    }

    /// The first consequent statement for a case, cascading into following
    /// cases when this one is empty.
    fn consequent_for_case(&self, case: NodeId, consequent: &[NodeId]) -> Option<NodeId> {
        if let Some(first) = consequent.first() {
            return Some(*first);
        }
        next_consequent_for_case(self.ast, case)
    }

    /// The clause evaluated when this case's test fails: the next
    /// case-labeled clause, or the default clause once no cases remain.
    fn next_case(&self, case: NodeId) -> Option<NodeId> {
        let mut next = self.ast.next_sibling(case);
        while let Some(current) = next {
            if matches!(self.ast.kind(current), NodeKind::SwitchCase { test: Some(_), .. }) {
                return Some(current);
            }
            next = self.ast.next_sibling(current);
        }

        // No further cases; the default clause (anywhere in the list) runs last.
        let switch = self.ast.parent(case)?;
        let cases = match self.ast.kind(switch) {
            NodeKind::SwitchStatement { cases, .. } => cases,
            _ => return None,
        };
        cases
            .iter()
            .copied()
            .find(|&c| matches!(self.ast.kind(c), NodeKind::SwitchCase { test: None, .. }))
    }
}

/// True when evaluating the statement's direct sub-expressions might throw:
/// calls, member accesses, assignments, updates, unary operations, `new`,
/// and tagged templates. Nested statements are not considered — they get
/// their own exception edges.
pub fn may_throw(ast: &Ast, node: NodeId) -> bool {
    debug_assert!(
        ast.is_statement(node) || matches!(ast.kind(node), NodeKind::VariableDeclaration { .. }),
        "may_throw expects a statement"
    );

    if matches!(ast.kind(node), NodeKind::ThrowStatement { .. }) {
        return true;
    }
    if ast.kind(node).is_function() {
        return false;
    }

    let mut stack: Vec<NodeId> = ast.children(node).into_vec();
    while let Some(current) = stack.pop() {
        if ast.kind(current).is_statement() || matches!(ast.kind(current), NodeKind::SwitchCase { .. }) {
            continue;
        }
        match ast.kind(current) {
            NodeKind::CallExpression { .. }
            | NodeKind::NewExpression { .. }
            | NodeKind::MemberExpression { .. }
            | NodeKind::TaggedTemplateExpression { .. }
            | NodeKind::AssignmentExpression { .. }
            | NodeKind::UpdateExpression { .. }
            | NodeKind::UnaryExpression { .. } => return true,
            _ => stack.extend(ast.children(current)),
        }
    }
    false
}

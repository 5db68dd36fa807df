//! One-line rendering of statements and expressions.
//!
//! The CFG surface labels nodes and edges with this rendering; error messages
//! use it to point at the offending construct.

use super::{Ast, NodeId, NodeKind};

impl Ast {
    /// Render a node on a single line, without trailing semicolon.
    pub fn pretty(&self, id: NodeId) -> String {
        match self.kind(id) {
            NodeKind::Program { .. } => "<program>".to_owned(),
            NodeKind::BlockStatement { .. } => "{ ... }".to_owned(),
            NodeKind::EmptyStatement => ";".to_owned(),
            NodeKind::ExpressionStatement { expression } => self.pretty(*expression),
            NodeKind::VariableDeclaration { kind, declarations } => {
                let keyword = match kind {
                    super::DeclarationKind::Var => "var",
                    super::DeclarationKind::Let => "let",
                    super::DeclarationKind::Const => "const",
                };
                let decls: Vec<String> =
                    declarations.iter().map(|d| self.pretty(*d)).collect();
                format!("{} {}", keyword, decls.join(", "))
            }
            NodeKind::VariableDeclarator { id: name, init } => match init {
                Some(init) => format!("{} = {}", self.pretty(*name), self.pretty(*init)),
                None => self.pretty(*name),
            },
            NodeKind::IfStatement { test, .. } => format!("if ({})", self.pretty(*test)),
            NodeKind::WhileStatement { test, .. } => format!("while ({})", self.pretty(*test)),
            NodeKind::DoWhileStatement { test, .. } => {
                format!("do ... while ({})", self.pretty(*test))
            }
            NodeKind::ForStatement {
                init, test, update, ..
            } => format!(
                "for ({}; {}; {})",
                init.map_or(String::new(), |n| self.pretty(n)),
                test.map_or(String::new(), |n| self.pretty(n)),
                update.map_or(String::new(), |n| self.pretty(n)),
            ),
            NodeKind::ForInStatement { left, right, .. } => {
                format!("for ({} in {})", self.pretty(*left), self.pretty(*right))
            }
            NodeKind::ForOfStatement { left, right, .. } => {
                format!("for ({} of {})", self.pretty(*left), self.pretty(*right))
            }
            NodeKind::SwitchStatement { discriminant, .. } => {
                format!("switch ({})", self.pretty(*discriminant))
            }
            NodeKind::SwitchCase { test, .. } => match test {
                Some(test) => format!("case {}:", self.pretty(*test)),
                None => "default:".to_owned(),
            },
            NodeKind::BreakStatement { label } => match label {
                Some(label) => format!("break {label}"),
                None => "break".to_owned(),
            },
            NodeKind::ContinueStatement { label } => match label {
                Some(label) => format!("continue {label}"),
                None => "continue".to_owned(),
            },
            NodeKind::LabeledStatement { label, body } => {
                format!("{label}: {}", self.pretty(*body))
            }
            NodeKind::ReturnStatement { argument } => match argument {
                Some(argument) => format!("return {}", self.pretty(*argument)),
                None => "return".to_owned(),
            },
            NodeKind::ThrowStatement { argument } => format!("throw {}", self.pretty(*argument)),
            NodeKind::TryStatement { .. } => "try".to_owned(),
            NodeKind::CatchClause { param, .. } => match param {
                Some(param) => format!("catch ({})", self.pretty(*param)),
                None => "catch".to_owned(),
            },
            NodeKind::FunctionDeclaration { id, params, .. } => format!(
                "function {}({})",
                id.map_or(String::new(), |n| self.pretty(n)),
                self.pretty_list(params),
            ),
            NodeKind::FunctionExpression { id, params, .. } => format!(
                "function {}({})",
                id.map_or(String::new(), |n| self.pretty(n)),
                self.pretty_list(params),
            ),
            NodeKind::ArrowFunctionExpression { params, body, .. } => {
                format!("({}) => {}", self.pretty_list(params), self.pretty(*body))
            }
            NodeKind::Identifier { name } => name.clone(),
            NodeKind::NumberLiteral { value } => {
                if value.fract() == 0.0 && value.is_finite() {
                    format!("{}", *value as i64)
                } else {
                    format!("{value}")
                }
            }
            NodeKind::StringLiteral { value } => format!("\"{value}\""),
            NodeKind::BooleanLiteral { value } => value.to_string(),
            NodeKind::NullLiteral => "null".to_owned(),
            NodeKind::TemplateLiteral { .. } => "`...`".to_owned(),
            NodeKind::TaggedTemplateExpression { tag, .. } => {
                format!("{}`...`", self.pretty(*tag))
            }
            NodeKind::ArrayExpression { elements } => {
                format!("[{}]", self.pretty_list(elements))
            }
            NodeKind::ObjectExpression { properties } => {
                format!("{{{}}}", self.pretty_list(properties))
            }
            NodeKind::ObjectProperty { key, value, .. } => {
                format!("{}: {}", self.pretty(*key), self.pretty(*value))
            }
            NodeKind::MemberExpression {
                object,
                property,
                computed,
            } => {
                if *computed {
                    format!("{}[{}]", self.pretty(*object), self.pretty(*property))
                } else {
                    format!("{}.{}", self.pretty(*object), self.pretty(*property))
                }
            }
            NodeKind::CallExpression { callee, arguments } => {
                format!("{}({})", self.pretty(*callee), self.pretty_list(arguments))
            }
            NodeKind::NewExpression { callee, arguments } => {
                format!(
                    "new {}({})",
                    self.pretty(*callee),
                    self.pretty_list(arguments)
                )
            }
            NodeKind::AssignmentExpression {
                operator,
                left,
                right,
            } => format!(
                "{} {} {}",
                self.pretty(*left),
                operator.as_str(),
                self.pretty(*right)
            ),
            NodeKind::BinaryExpression {
                operator,
                left,
                right,
            } => format!(
                "{} {} {}",
                self.pretty(*left),
                operator.as_str(),
                self.pretty(*right)
            ),
            NodeKind::LogicalExpression {
                operator,
                left,
                right,
            } => format!(
                "{} {} {}",
                self.pretty(*left),
                operator.as_str(),
                self.pretty(*right)
            ),
            NodeKind::UnaryExpression { operator, argument } => {
                format!("{}{}", operator.as_str(), self.pretty(*argument))
            }
            NodeKind::UpdateExpression {
                operator,
                prefix,
                argument,
            } => {
                if *prefix {
                    format!("{}{}", operator.as_str(), self.pretty(*argument))
                } else {
                    format!("{}{}", self.pretty(*argument), operator.as_str())
                }
            }
            NodeKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => format!(
                "{} ? {} : {}",
                self.pretty(*test),
                self.pretty(*consequent),
                self.pretty(*alternate)
            ),
            NodeKind::SequenceExpression { expressions } => self.pretty_list(expressions),
            NodeKind::ThisExpression => "this".to_owned(),
        }
    }

    fn pretty_list(&self, ids: &[NodeId]) -> String {
        ids.iter()
            .map(|&n| self.pretty(n))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

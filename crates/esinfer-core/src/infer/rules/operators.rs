//! Refinement of operator expressions.
//!
//! Binary and assignment operators are table-driven: each operator states the
//! required operand types (possibly `Maybe`-wrapped) and its result type.
//! Operands are unified against the requirements before the result type is
//! produced.

use crate::ast::{BinaryOperator, NodeId, NodeKind, UnaryOperator};
use crate::error::TypeError;
use crate::infer::context::InferenceContext;
use crate::infer::rules::RefinementRule;
use crate::types::Type;

/// How an operator constrains its operands.
#[derive(Debug, Clone, Copy)]
enum OperatorKind {
    /// Both operands unify against `Maybe<number>`; the result is a number.
    Numeric,
    /// Both operands unify against `Maybe<number>`; the result is a boolean.
    Comparison,
    /// Loose equality accepts anything and yields a boolean.
    Equality,
    /// Strict equality requires the right side to unify with the left and
    /// yields a boolean.
    StrictEquality,
}

/// The table entry for `operator`, or `None` for operators the analysis does
/// not model.
fn operator_kind(operator: BinaryOperator) -> Option<OperatorKind> {
    use BinaryOperator::*;
    match operator {
        Add | Sub | Mul | Div | Rem | ShiftLeft | ShiftRight | UnsignedShiftRight | BitOr
        | BitAnd | BitXor => Some(OperatorKind::Numeric),
        Lt | Gt | Le | Ge => Some(OperatorKind::Comparison),
        Eq | NotEq => Some(OperatorKind::Equality),
        StrictEq | StrictNotEq => Some(OperatorKind::StrictEquality),
        In | Instanceof => None,
    }
}

/// Unifies the operand types against the operator's requirements and returns
/// the operator's result type.
fn refine_operator(
    kind: OperatorKind,
    left: &Type,
    right: &Type,
    node: NodeId,
    ctx: &mut InferenceContext<'_>,
) -> Result<Type, TypeError> {
    match kind {
        OperatorKind::Numeric | OperatorKind::Comparison => {
            let required = Type::maybe(Type::Number);
            ctx.unify(left, &required, node)?;
            ctx.unify(&required, right, node)?;
            Ok(match kind {
                OperatorKind::Numeric => Type::Number,
                _ => Type::Boolean,
            })
        }
        OperatorKind::Equality => Ok(Type::Boolean),
        OperatorKind::StrictEquality => {
            ctx.unify(left, right, node)?;
            Ok(Type::Boolean)
        }
    }
}

/// Binary expressions refine *copies* of the operand types: `x + 1` must not
/// change what the environment knows about `x`.
pub struct BinaryExpressionRefinementRule;

impl RefinementRule for BinaryExpressionRefinementRule {
    fn name(&self) -> &'static str {
        "BinaryExpressionRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(kind, NodeKind::BinaryExpression { .. })
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        let (operator, left, right) = match ctx.program().ast().kind(node) {
            NodeKind::BinaryExpression {
                operator,
                left,
                right,
            } => (*operator, *left, *right),
            _ => unreachable!("can_refine admitted the node"),
        };

        let kind = operator_kind(operator).ok_or_else(|| TypeError::UnsupportedOperator {
            context: "binary",
            operator: operator.as_str().to_owned(),
            node,
        })?;

        let left_type = ctx.infer(left)?.fresh();
        let right_type = ctx.infer(right)?.fresh();
        refine_operator(kind, &left_type, &right_type, node, ctx)
    }
}

/// Assignments bind the target to a fresh copy of the right-hand type;
/// compound assignments route through the binary operator table first.
pub struct AssignmentExpressionRefinementRule;

impl AssignmentExpressionRefinementRule {
    fn assigned_type(
        &self,
        node: NodeId,
        left: NodeId,
        right: NodeId,
        ctx: &mut InferenceContext<'_>,
    ) -> Result<Type, TypeError> {
        let operator = match ctx.program().ast().kind(node) {
            NodeKind::AssignmentExpression { operator, .. } => *operator,
            _ => unreachable!("assigned_type expects an assignment"),
        };

        match operator.binary_operator() {
            None => ctx.infer(right),
            Some(binary) => {
                let kind =
                    operator_kind(binary).ok_or_else(|| TypeError::UnsupportedOperator {
                        context: "assignment",
                        operator: operator.as_str().to_owned(),
                        node,
                    })?;
                let left_type = ctx.infer(left)?;
                let right_type = ctx.infer(right)?;
                refine_operator(kind, &left_type, &right_type, node, ctx)
            }
        }
    }

    fn assign(
        &self,
        left: NodeId,
        ty: Type,
        ctx: &mut InferenceContext<'_>,
    ) -> Result<(), TypeError> {
        match ctx.program().ast().kind(left) {
            NodeKind::MemberExpression { property, .. } => {
                self.assign_property(left, *property, ty, ctx)
            }
            _ => {
                let symbol = ctx
                    .symbol_of(left)
                    .expect("extraction resolves every assignment target");
                ctx.set_type(symbol, ty);
                Ok(())
            }
        }
    }

    /// Writing through a member access rewrites the object's record type in
    /// place (same identity, new content), so every alias observes the new
    /// property.
    fn assign_property(
        &self,
        member: NodeId,
        property: NodeId,
        ty: Type,
        ctx: &mut InferenceContext<'_>,
    ) -> Result<(), TypeError> {
        let object_type = ctx.object_type(member)?;
        if matches!(object_type, Type::Any) {
            return Ok(());
        }

        let symbol = ctx
            .symbol_of(property)
            .expect("extraction assigns every member a symbol");
        let name = ctx.program().symbols().name(symbol);
        let computed = ctx.program().symbols().flags(symbol).is_computed();

        let updated = match &object_type {
            Type::String => {
                return Err(TypeError::BuiltinPropertyAssignment {
                    property: name,
                    ty: object_type,
                    node: property,
                });
            }
            Type::Array { .. } => {
                if computed || is_numeric(&name) {
                    // Writing an element rewrites the element type.
                    object_type.with_property_type(&name, true, ty)
                } else if object_type.property_type(&name, false).is_some() {
                    return Err(TypeError::BuiltinPropertyAssignment {
                        property: name,
                        ty: object_type,
                        node: property,
                    });
                } else {
                    // Ad-hoc named properties on arrays are not tracked.
                    return Ok(());
                }
            }
            _ => {
                if object_type.has_property(&name, computed) {
                    object_type.with_property_type(&name, computed, ty)
                } else {
                    object_type.with_added_property(&name, ty)
                }
            }
        };

        ctx.substitute(&object_type, &updated);
        Ok(())
    }
}

fn is_numeric(name: &str) -> bool {
    name.parse::<f64>().is_ok()
}

impl RefinementRule for AssignmentExpressionRefinementRule {
    fn name(&self) -> &'static str {
        "AssignmentExpressionRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(kind, NodeKind::AssignmentExpression { .. })
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        let (left, right) = match ctx.program().ast().kind(node) {
            NodeKind::AssignmentExpression { left, right, .. } => (*left, *right),
            _ => unreachable!("can_refine admitted the node"),
        };

        let right_type = self.assigned_type(node, left, right, ctx)?;
        self.assign(left, right_type.fresh(), ctx)?;
        Ok(right_type)
    }
}

/// `&&` and `||` evaluate both sides and produce a boolean.
pub struct LogicalExpressionRefinementRule;

impl RefinementRule for LogicalExpressionRefinementRule {
    fn name(&self) -> &'static str {
        "LogicalExpressionRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(kind, NodeKind::LogicalExpression { .. })
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        let (left, right) = match ctx.program().ast().kind(node) {
            NodeKind::LogicalExpression { left, right, .. } => (*left, *right),
            _ => unreachable!("can_refine admitted the node"),
        };
        ctx.infer(left)?;
        ctx.infer(right)?;
        Ok(Type::Boolean)
    }
}

/// Unary operators.
pub struct UnaryExpressionRefinementRule;

impl RefinementRule for UnaryExpressionRefinementRule {
    fn name(&self) -> &'static str {
        "UnaryExpressionRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(kind, NodeKind::UnaryExpression { .. })
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        let (operator, argument) = match ctx.program().ast().kind(node) {
            NodeKind::UnaryExpression { operator, argument } => (*operator, *argument),
            _ => unreachable!("can_refine admitted the node"),
        };

        let argument_type = ctx.infer(argument)?;
        match operator {
            UnaryOperator::Void => Ok(Type::Void),
            UnaryOperator::Plus | UnaryOperator::Minus | UnaryOperator::BitNot => {
                ctx.unify(&argument_type, &Type::Number, node)?;
                Ok(Type::Number)
            }
            UnaryOperator::Not => Ok(Type::Boolean),
            UnaryOperator::TypeOf => Ok(Type::String),
            UnaryOperator::Delete => Err(TypeError::UnsupportedOperator {
                context: "unary",
                operator: operator.as_str().to_owned(),
                node,
            }),
        }
    }
}

/// `++`/`--` require a nullable number and produce a number.
pub struct UpdateExpressionRefinementRule;

impl RefinementRule for UpdateExpressionRefinementRule {
    fn name(&self) -> &'static str {
        "UpdateExpressionRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(kind, NodeKind::UpdateExpression { .. })
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        let argument = match ctx.program().ast().kind(node) {
            NodeKind::UpdateExpression { argument, .. } => *argument,
            _ => unreachable!("can_refine admitted the node"),
        };
        let argument_type = ctx.infer(argument)?;
        ctx.unify(&Type::maybe(Type::Number), &argument_type, argument)?;
        Ok(Type::Number)
    }
}

/// `test ? a : b` unifies the types of both alternatives.
pub struct ConditionalExpressionRefinementRule;

impl RefinementRule for ConditionalExpressionRefinementRule {
    fn name(&self) -> &'static str {
        "ConditionalExpressionRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(kind, NodeKind::ConditionalExpression { .. })
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        let (test, consequent, alternate) = match ctx.program().ast().kind(node) {
            NodeKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => (*test, *consequent, *alternate),
            _ => unreachable!("can_refine admitted the node"),
        };
        ctx.infer(test)?;
        let consequent_type = ctx.infer(consequent)?;
        let alternate_type = ctx.infer(alternate)?;
        ctx.unify(&consequent_type, &alternate_type, node)
    }
}

/// `a, b, c` evaluates every expression and has the type of the last one.
pub struct SequenceExpressionRefinementRule;

impl RefinementRule for SequenceExpressionRefinementRule {
    fn name(&self) -> &'static str {
        "SequenceExpressionRefinementRule"
    }

    fn can_refine(&self, kind: &NodeKind) -> bool {
        matches!(kind, NodeKind::SequenceExpression { .. })
    }

    fn refine(&self, node: NodeId, ctx: &mut InferenceContext<'_>) -> Result<Type, TypeError> {
        let expressions = match ctx.program().ast().kind(node) {
            NodeKind::SequenceExpression { expressions } => expressions.clone(),
            _ => unreachable!("can_refine admitted the node"),
        };
        let mut ty = Type::Void;
        for expression in expressions {
            ty = ctx.infer(expression)?;
        }
        Ok(ty)
    }
}

//! Type unification: computing the most specific common type of two types.
//!
//! Base-type pairs are handled by a fixed registry of rules; exactly one rule
//! may claim a pair. No matching rule means the types are incompatible; more
//! than one is a defect in the rule set. Type variables bind to the other
//! side after an occurs check.

use crate::error::UnificationError;
use crate::types::Type;

/// A unification rule for one shape of base-type pair.
pub trait UnificationRule {
    fn name(&self) -> &'static str;

    /// True if this rule can unify the pair.
    fn can_unify(&self, t1: &Type, t2: &Type) -> bool;

    /// Unifies the pair into their most specific common type.
    fn unify(
        &self,
        t1: &Type,
        t2: &Type,
        unificator: &TypeUnificator,
    ) -> Result<Type, UnificationError>;
}

/// Rule-dispatching unificator.
pub struct TypeUnificator {
    rules: Vec<Box<dyn UnificationRule>>,
}

impl TypeUnificator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(AnyUnificationRule),
                Box::new(UndefinedUnificationRule),
                Box::new(NullMaybeUnificationRule),
                Box::new(NullUnificationRule),
                Box::new(MaybeUnificationRule),
                Box::new(ParametrizedUnificationRule),
                Box::new(ArrayUnificationRule),
                Box::new(RecordUnificationRule),
            ],
        }
    }

    /// The most specific common type of `t1` and `t2`.
    pub fn unify(&self, t1: &Type, t2: &Type) -> Result<Type, UnificationError> {
        if t1 == t2 {
            return Ok(t1.clone());
        }

        if t1.is_base() && t2.is_base() {
            return self.unify_base_types(t1, t2);
        }

        if t1.is_variable() {
            if t1.occurs_in(t2) {
                return Err(UnificationError::OccursCheck {
                    t1: t1.clone(),
                    t2: t2.clone(),
                });
            }
            return Ok(t2.clone());
        }

        // t2 is the type variable; flip so the binding case above applies.
        self.unify(t2, t1)
    }

    fn unify_base_types(&self, t1: &Type, t2: &Type) -> Result<Type, UnificationError> {
        let matching: Vec<&Box<dyn UnificationRule>> = self
            .rules
            .iter()
            .filter(|rule| rule.can_unify(t1, t2))
            .collect();

        match matching.as_slice() {
            [] => Err(UnificationError::NotUnifiable {
                t1: t1.clone(),
                t2: t2.clone(),
            }),
            [rule] => rule.unify(t1, t2, self),
            rules => Err(UnificationError::AmbiguousRule {
                t1: t1.clone(),
                t2: t2.clone(),
                rules: rules
                    .iter()
                    .map(|rule| rule.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}

impl Default for TypeUnificator {
    fn default() -> Self {
        Self::new()
    }
}

/// `any` absorbs every other type.
struct AnyUnificationRule;

impl UnificationRule for AnyUnificationRule {
    fn name(&self) -> &'static str {
        "AnyUnificationRule"
    }

    fn can_unify(&self, t1: &Type, t2: &Type) -> bool {
        matches!(t1, Type::Any) || matches!(t2, Type::Any)
    }

    fn unify(&self, t1: &Type, _t2: &Type, _u: &TypeUnificator) -> Result<Type, UnificationError> {
        Ok(if matches!(t1, Type::Any) {
            t1.clone()
        } else {
            Type::Any
        })
    }
}

/// `undefined` is just a not-yet-initialized value; the other type wins.
struct UndefinedUnificationRule;

impl UnificationRule for UndefinedUnificationRule {
    fn name(&self) -> &'static str {
        "UndefinedUnificationRule"
    }

    fn can_unify(&self, t1: &Type, t2: &Type) -> bool {
        let other = match (t1, t2) {
            (Type::Void, other) | (other, Type::Void) => other,
            _ => return false,
        };
        !matches!(other, Type::Any)
    }

    fn unify(&self, t1: &Type, t2: &Type, _u: &TypeUnificator) -> Result<Type, UnificationError> {
        Ok(if matches!(t1, Type::Void) {
            t2.clone()
        } else {
            t1.clone()
        })
    }
}

/// `null` is already covered by a maybe type.
struct NullMaybeUnificationRule;

impl UnificationRule for NullMaybeUnificationRule {
    fn name(&self) -> &'static str {
        "NullMaybeUnificationRule"
    }

    fn can_unify(&self, t1: &Type, t2: &Type) -> bool {
        matches!(
            (t1, t2),
            (Type::Null, Type::Maybe { .. }) | (Type::Maybe { .. }, Type::Null)
        )
    }

    fn unify(&self, t1: &Type, t2: &Type, _u: &TypeUnificator) -> Result<Type, UnificationError> {
        Ok(if matches!(t1, Type::Maybe { .. }) {
            t1.clone()
        } else {
            t2.clone()
        })
    }
}

/// `null` unified with a value type `T` widens to `Maybe<T>`: the value may
/// still be null after the merge (`let x = null; x = 5;`).
struct NullUnificationRule;

impl UnificationRule for NullUnificationRule {
    fn name(&self) -> &'static str {
        "NullUnificationRule"
    }

    fn can_unify(&self, t1: &Type, t2: &Type) -> bool {
        let other = match (t1, t2) {
            (Type::Null, other) | (other, Type::Null) => other,
            _ => return false,
        };
        !matches!(other, Type::Maybe { .. } | Type::Void | Type::Any)
    }

    fn unify(&self, t1: &Type, t2: &Type, _u: &TypeUnificator) -> Result<Type, UnificationError> {
        let other = if matches!(t1, Type::Null) { t2 } else { t1 };
        Ok(Type::maybe(other.clone()))
    }
}

/// `Maybe<T>` unified with a plain value type `S` is `Maybe<unify(T, S)>` —
/// the value may still be null after the operation.
struct MaybeUnificationRule;

impl MaybeUnificationRule {
    fn split<'t>(t1: &'t Type, t2: &'t Type) -> Option<(&'t Type, &'t Type)> {
        match (t1, t2) {
            (Type::Maybe { .. }, Type::Maybe { .. }) => None,
            (maybe @ Type::Maybe { .. }, other) | (other, maybe @ Type::Maybe { .. }) => {
                Some((maybe, other))
            }
            _ => None,
        }
    }
}

impl UnificationRule for MaybeUnificationRule {
    fn name(&self) -> &'static str {
        "MaybeUnificationRule"
    }

    fn can_unify(&self, t1: &Type, t2: &Type) -> bool {
        match Self::split(t1, t2) {
            Some((_, other)) => !matches!(other, Type::Null | Type::Any | Type::Void),
            None => false,
        }
    }

    fn unify(&self, t1: &Type, t2: &Type, u: &TypeUnificator) -> Result<Type, UnificationError> {
        let (maybe, other) = Self::split(t1, t2).expect("can_unify admitted the pair");
        let Type::Maybe { of, .. } = maybe else {
            unreachable!("split returns a maybe type");
        };
        if **of == *other {
            return Ok(maybe.clone());
        }
        Ok(Type::maybe(u.unify(other, of)?))
    }
}

/// Parametrized types of the same kind unify parameter-wise.
struct ParametrizedUnificationRule;

impl UnificationRule for ParametrizedUnificationRule {
    fn name(&self) -> &'static str {
        "ParametrizedUnificationRule"
    }

    fn can_unify(&self, t1: &Type, t2: &Type) -> bool {
        matches!(
            (t1, t2),
            (Type::Maybe { .. }, Type::Maybe { .. }) | (Type::Function { .. }, Type::Function { .. })
        )
    }

    fn unify(&self, t1: &Type, t2: &Type, u: &TypeUnificator) -> Result<Type, UnificationError> {
        match (t1, t2) {
            (Type::Maybe { of: of1, .. }, Type::Maybe { of: of2, .. }) => {
                let unified = u.unify(of1, of2)?;
                if unified == **of1 {
                    Ok(t1.clone())
                } else {
                    Ok(Type::maybe(unified))
                }
            }
            (
                Type::Function {
                    this: this1,
                    params: params1,
                    ret: ret1,
                    ..
                },
                Type::Function {
                    this: this2,
                    params: params2,
                    ret: ret2,
                    ..
                },
            ) => {
                if params1.len() != params2.len() {
                    return Err(UnificationError::ParameterCountMismatch {
                        t1: t1.clone(),
                        t2: t2.clone(),
                    });
                }
                let this = u.unify(this1, this2)?;
                let ret = u.unify(ret1, ret2)?;
                let params: Vec<Type> = params1
                    .iter()
                    .zip(params2.iter())
                    .map(|(a, b)| u.unify(a, b))
                    .collect::<Result<_, _>>()?;

                let unchanged = this == **this1
                    && ret == **ret1
                    && params.iter().zip(params1.iter()).all(|(a, b)| a == b);
                if unchanged {
                    Ok(t1.clone())
                } else {
                    Ok(t1.rebuilt_function(this, params, ret))
                }
            }
            _ => unreachable!("can_unify admitted the pair"),
        }
    }
}

/// Arrays unify element-wise.
struct ArrayUnificationRule;

impl UnificationRule for ArrayUnificationRule {
    fn name(&self) -> &'static str {
        "ArrayUnificationRule"
    }

    fn can_unify(&self, t1: &Type, t2: &Type) -> bool {
        matches!((t1, t2), (Type::Array { .. }, Type::Array { .. }))
    }

    fn unify(&self, t1: &Type, t2: &Type, u: &TypeUnificator) -> Result<Type, UnificationError> {
        let (Type::Array { of: of1, .. }, Type::Array { of: of2, .. }) = (t1, t2) else {
            unreachable!("can_unify admitted the pair");
        };
        let unified = Type::array(u.unify(of1, of2)?);
        if unified == *t1 {
            Ok(t1.clone())
        } else if unified == *t2 {
            Ok(t2.clone())
        } else {
            Ok(unified)
        }
    }
}

/// Records unify to the intersection of their properties, each common
/// property recursively unified.
struct RecordUnificationRule;

impl UnificationRule for RecordUnificationRule {
    fn name(&self) -> &'static str {
        "RecordUnificationRule"
    }

    fn can_unify(&self, t1: &Type, t2: &Type) -> bool {
        matches!((t1, t2), (Type::Record { .. }, Type::Record { .. }))
    }

    fn unify(&self, t1: &Type, t2: &Type, u: &TypeUnificator) -> Result<Type, UnificationError> {
        let (
            Type::Record {
                properties: props1, ..
            },
            Type::Record {
                properties: props2, ..
            },
        ) = (t1, t2)
        else {
            unreachable!("can_unify admitted the pair");
        };

        let (smaller_ty, smaller, larger) = if props1.len() <= props2.len() {
            (t1, props1, props2)
        } else {
            (t2, props2, props1)
        };

        let mut common = indexmap::IndexMap::new();
        for (name, ty) in smaller {
            if let Some(other) = larger.get(name) {
                common.insert(name.clone(), u.unify(ty, other)?);
            }
        }

        if common == *smaller {
            Ok(smaller_ty.clone())
        } else {
            Ok(Type::record(common))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unify(t1: &Type, t2: &Type) -> Result<Type, UnificationError> {
        TypeUnificator::new().unify(t1, t2)
    }

    #[test]
    fn test_equal_types_unify_to_themselves() {
        assert_eq!(unify(&Type::Number, &Type::Number).unwrap(), Type::Number);
    }

    #[test]
    fn test_incompatible_base_types_fail() {
        let result = unify(&Type::Number, &Type::String);
        assert!(matches!(result, Err(UnificationError::NotUnifiable { .. })));
    }

    #[test]
    fn test_variable_binds_to_base_type() {
        let variable = Type::variable();
        assert_eq!(unify(&variable, &Type::Number).unwrap(), Type::Number);
        assert_eq!(unify(&Type::Number, &variable).unwrap(), Type::Number);
    }

    #[test]
    fn test_occurs_check_rejects_cyclic_binding() {
        let variable = Type::variable();
        let maybe = Type::maybe(variable.clone());
        let result = unify(&variable, &maybe);
        assert!(matches!(result, Err(UnificationError::OccursCheck { .. })));
    }

    #[test]
    fn test_any_absorbs() {
        assert_eq!(unify(&Type::Any, &Type::Number).unwrap(), Type::Any);
        assert_eq!(unify(&Type::Null, &Type::Any).unwrap(), Type::Any);
    }

    #[test]
    fn test_undefined_yields_the_other_type() {
        assert_eq!(unify(&Type::Void, &Type::String).unwrap(), Type::String);
        assert_eq!(unify(&Type::Number, &Type::Void).unwrap(), Type::Number);
    }

    #[test]
    fn test_null_widens_to_maybe() {
        assert_eq!(
            unify(&Type::Null, &Type::Number).unwrap(),
            Type::maybe(Type::Number)
        );
    }

    #[test]
    fn test_null_with_maybe_keeps_maybe() {
        let maybe = Type::maybe(Type::String);
        assert_eq!(unify(&Type::Null, &maybe).unwrap(), maybe);
    }

    #[test]
    fn test_maybe_with_inner_type_keeps_maybe() {
        let maybe = Type::maybe(Type::Number);
        assert_eq!(unify(&maybe, &Type::Number).unwrap(), maybe);
    }

    #[test]
    fn test_arrays_unify_element_wise() {
        let variable = Type::variable();
        let open = Type::array(variable);
        let concrete = Type::array(Type::Number);
        assert_eq!(unify(&open, &concrete).unwrap(), concrete);
    }

    #[test]
    fn test_records_unify_to_property_intersection() {
        let left = Type::record([
            ("name".to_owned(), Type::String),
            ("age".to_owned(), Type::Number),
        ]);
        let right = Type::record([
            ("name".to_owned(), Type::String),
            ("city".to_owned(), Type::String),
        ]);

        let unified = unify(&left, &right).unwrap();
        assert_eq!(unified, Type::record([("name".to_owned(), Type::String)]));
    }

    #[test]
    fn test_unification_is_symmetric() {
        let samples = [
            Type::Number,
            Type::String,
            Type::maybe(Type::Number),
            Type::variable(),
            Type::record([("a".to_owned(), Type::Number)]),
        ];
        for t1 in &samples {
            for t2 in &samples {
                let forward = unify(t1, t2);
                let backward = unify(t2, t1);
                match (forward, backward) {
                    (Ok(a), Ok(b)) => assert_eq!(a, b, "unify({t1}, {t2}) asymmetric"),
                    (Err(_), Err(_)) => {}
                    (a, b) => panic!("unify({t1}, {t2}) disagrees: {a:?} vs {b:?}"),
                }
            }
        }
    }

    #[test]
    fn test_function_parameter_count_mismatch_fails() {
        let f1 = Type::function(Type::Void, vec![Type::Number], Type::Number);
        let f2 = Type::function(Type::Void, vec![], Type::Number);
        let result = unify(&f1, &f2);
        assert!(matches!(
            result,
            Err(UnificationError::ParameterCountMismatch { .. })
        ));
    }
}

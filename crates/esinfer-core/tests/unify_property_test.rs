//! Property tests over the unificator: symmetry and the occurs check.

use esinfer_core::infer::TypeUnificator;
use esinfer_core::{Type, UnificationError};
use proptest::prelude::*;

/// Small random types without type variables (variables carry identity, so
/// symmetric runs would not see the same variable twice).
fn base_type() -> impl Strategy<Value = Type> {
    let leaf = prop_oneof![
        Just(Type::Number),
        Just(Type::String),
        Just(Type::Boolean),
        Just(Type::Null),
        Just(Type::Void),
        Just(Type::Any),
    ];
    leaf.prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(Type::maybe),
            inner.clone().prop_map(Type::array),
            prop::collection::vec(("[a-c]", inner), 0..3)
                .prop_map(|properties| Type::record(properties)),
        ]
    })
}

proptest! {
    #[test]
    fn unification_is_symmetric(t1 in base_type(), t2 in base_type()) {
        let unificator = TypeUnificator::new();
        let forward = unificator.unify(&t1, &t2);
        let backward = unificator.unify(&t2, &t1);
        match (forward, backward) {
            (Ok(a), Ok(b)) => prop_assert_eq!(a, b),
            (Err(_), Err(_)) => {}
            (a, b) => prop_assert!(false, "asymmetric outcome: {:?} vs {:?}", a, b),
        }
    }

    #[test]
    fn unifying_a_type_with_itself_is_identity(t in base_type()) {
        let unificator = TypeUnificator::new();
        let unified = unificator.unify(&t, &t).unwrap();
        prop_assert_eq!(unified, t);
    }

    #[test]
    fn occurs_check_rejects_a_variable_inside_its_own_binding(depth in 1usize..4) {
        let variable = Type::variable();
        // Nest the variable at increasing depth: Maybe<v>, Maybe<v[]>, ...
        let mut nested = variable.clone();
        for level in 0..depth {
            nested = if level % 2 == 0 {
                Type::maybe(nested)
            } else {
                Type::array(nested)
            };
        }
        let unificator = TypeUnificator::new();
        let result = unificator.unify(&variable, &nested);
        prop_assert!(
            matches!(result, Err(UnificationError::OccursCheck { .. })),
            "expected occurs-check error, got {:?}",
            result
        );
    }
}

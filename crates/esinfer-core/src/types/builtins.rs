//! Member signatures of the built-in `string` and array types.

use super::Type;

/// The type of the built-in string member `name`, or `None` if strings have
/// no such member. `receiver` is the string type itself.
pub fn string_builtin(receiver: &Type, name: &str) -> Option<Type> {
    let string = || receiver.clone();
    let number = || Type::Number;
    let boolean = || Type::Boolean;
    let method = |params: Vec<Type>, ret: Type| Type::function(receiver.clone(), params, ret);

    let ty = match name {
        "length" => number(),
        "charAt" => method(vec![number()], string()),
        "charCodeAt" | "codePointAt" => method(vec![number()], number()),
        "endsWith" | "startsWith" | "includes" => {
            method(vec![string(), Type::maybe(number())], boolean())
        }
        "indexOf" | "lastIndexOf" => method(vec![string(), Type::maybe(number())], number()),
        "normalize" => method(vec![Type::maybe(string())], string()),
        "repeat" => method(vec![number()], string()),
        "replace" => method(vec![string(), string()], string()),
        "slice" | "substring" => method(vec![number(), Type::maybe(number())], string()),
        "substr" => method(vec![number(), Type::maybe(number())], string()),
        "split" => method(
            vec![Type::maybe(string()), Type::maybe(number())],
            Type::array(string()),
        ),
        "trim" | "toLowerCase" | "toUpperCase" | "toLocaleLowerCase" | "toLocaleUpperCase"
        | "toString" | "valueOf" => method(vec![], string()),
        _ => return None,
    };
    Some(ty)
}

/// The type of the built-in array member `name`, or `None` if arrays have no
/// such member. `receiver` is the array type itself; its element type feeds
/// the signatures.
pub fn array_builtin(receiver: &Type, name: &str) -> Option<Type> {
    let element = match receiver {
        Type::Array { of, .. } => (**of).clone(),
        _ => return None,
    };
    let array = || receiver.clone();
    let number = || Type::Number;
    let boolean = || Type::Boolean;
    let method = |params: Vec<Type>, ret: Type| Type::function(receiver.clone(), params, ret);

    // Callbacks receive (element, index, array) with a caller-chosen `this`.
    let callback_this = Type::variable();
    let predicate = Type::function(
        callback_this.clone(),
        vec![element.clone(), number(), array()],
        boolean(),
    );
    let callback_this_argument = Type::maybe(callback_this.clone());

    let ty = match name {
        "length" => number(),
        "concat" => method(vec![array(), Type::maybe(array())], array()),
        "every" | "some" => method(vec![predicate, callback_this_argument], boolean()),
        "filter" => method(vec![predicate, callback_this_argument], array()),
        "find" => method(vec![predicate, callback_this_argument], element),
        "findIndex" => method(vec![predicate, callback_this_argument], number()),
        "forEach" => {
            let action = Type::function(
                callback_this,
                vec![element, number(), array()],
                Type::Void,
            );
            method(vec![action, callback_this_argument], Type::Void)
        }
        "includes" => method(vec![element, Type::maybe(number())], boolean()),
        "indexOf" | "lastIndexOf" => method(vec![element, Type::maybe(number())], number()),
        "join" => method(vec![Type::maybe(Type::String)], Type::String),
        "map" => {
            let mapped = Type::variable();
            let mapper = Type::function(
                callback_this,
                vec![element, number(), array()],
                mapped.clone(),
            );
            method(vec![mapper, callback_this_argument], Type::array(mapped))
        }
        "pop" | "shift" => method(vec![], element),
        "push" | "unshift" => method(vec![element], number()),
        "reduce" | "reduceRight" => {
            let accumulated = Type::variable();
            let reducer = Type::function(
                Type::Void,
                vec![accumulated.clone(), element, number(), array()],
                accumulated.clone(),
            );
            method(vec![reducer, Type::maybe(accumulated.clone())], accumulated)
        }
        "reverse" => method(vec![], array()),
        "slice" => method(vec![number(), Type::maybe(number())], array()),
        "sort" => {
            let comparator = Type::function(Type::Void, vec![element.clone(), element], number());
            method(vec![Type::maybe(comparator)], array())
        }
        _ => return None,
    };
    Some(ty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_length_is_number() {
        assert_eq!(string_builtin(&Type::String, "length"), Some(Type::Number));
    }

    #[test]
    fn test_unknown_string_member_is_absent() {
        assert_eq!(string_builtin(&Type::String, "nope"), None);
    }

    #[test]
    fn test_array_pop_returns_element() {
        let array = Type::array(Type::Number);
        let pop = array_builtin(&array, "pop").unwrap();
        match pop {
            Type::Function { ret, .. } => assert_eq!(*ret, Type::Number),
            other => panic!("expected a function type, got {other}"),
        }
    }

    #[test]
    fn test_array_filter_returns_same_array() {
        let array = Type::array(Type::String);
        let filter = array_builtin(&array, "filter").unwrap();
        match filter {
            Type::Function { ret, .. } => assert_eq!(*ret, Type::array(Type::String)),
            other => panic!("expected a function type, got {other}"),
        }
    }

    #[test]
    fn test_array_map_returns_variable_element() {
        let array = Type::array(Type::Number);
        let map = array_builtin(&array, "map").unwrap();
        match map {
            Type::Function { ret, .. } => {
                assert!(matches!(*ret, Type::Array { .. }));
            }
            other => panic!("expected a function type, got {other}"),
        }
    }
}

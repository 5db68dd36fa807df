//! Built-in globals: the symbols pre-declared in every program's global
//! scope and their types in the default environment.

use crate::semantic::scope::{ScopeId, ScopeTree};
use crate::semantic::symbol::SymbolFlags;
use crate::semantic::symbol_table::SymbolTable;
use crate::types::{Type, TypeEnvironment};

const GLOBALS: &[&str] = &["console", "document", "Object"];

/// Declares the built-in globals in the global scope. Runs before symbol
/// extraction so that references resolve to these symbols.
pub fn declare_globals(scopes: &mut ScopeTree, symbols: &SymbolTable) {
    for name in GLOBALS {
        let symbol = symbols.create(*name, SymbolFlags::VARIABLE);
        scopes.add_symbol(ScopeId::GLOBAL, name, symbol);
    }
}

/// Seeds `environment` with the types of the built-in globals.
pub fn default_type_environment(
    scopes: &ScopeTree,
    environment: TypeEnvironment,
) -> TypeEnvironment {
    let console_type = Type::record([(
        "log".to_owned(),
        Type::function(Type::Any, vec![Type::Any, Type::Any], Type::Void),
    )]);

    let event_type = Type::record([
        ("bubbles".to_owned(), Type::Boolean),
        ("cancelable".to_owned(), Type::Boolean),
        ("defaultPrevented".to_owned(), Type::Boolean),
        ("type".to_owned(), Type::String),
        (
            "preventDefault".to_owned(),
            Type::function(Type::Any, vec![], Type::Void),
        ),
        (
            "stopImmediatePropagation".to_owned(),
            Type::function(Type::Any, vec![], Type::Void),
        ),
        (
            "stopPropagation".to_owned(),
            Type::function(Type::Any, vec![], Type::Void),
        ),
    ]);
    let event_listener = Type::function(Type::Any, vec![event_type], Type::Any);
    let element_type = Type::record([(
        "addEventListener".to_owned(),
        Type::function(
            Type::Any,
            vec![Type::String, event_listener, Type::Any, Type::Any],
            Type::Void,
        ),
    )]);
    let document_type = Type::record([(
        "getElementById".to_owned(),
        Type::function(Type::Any, vec![Type::String], Type::maybe(element_type)),
    )]);

    let object_type = Type::record([(
        "keys".to_owned(),
        Type::function(
            Type::Any,
            vec![Type::empty_record()],
            Type::array(Type::String),
        ),
    )]);

    let mut environment = environment;
    for (name, ty) in [
        ("console", console_type),
        ("document", document_type),
        ("Object", object_type),
    ] {
        let symbol = scopes
            .get_own_symbol(ScopeId::GLOBAL, name)
            .unwrap_or_else(|| panic!("the global '{name}' is not declared"));
        environment = environment.set_type(symbol, ty);
    }
    environment
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_globals_are_declared_and_typed() {
        let mut scopes = ScopeTree::new();
        let symbols = SymbolTable::new();
        declare_globals(&mut scopes, &symbols);

        let environment = default_type_environment(&scopes, TypeEnvironment::new());

        let console = scopes.get_own_symbol(ScopeId::GLOBAL, "console").unwrap();
        let console_type = environment.get_type(console).unwrap();
        assert!(console_type.property_type("log", false).is_some());
    }
}

//! The type lattice: primitives, type variables, parametrized types and
//! record types.
//!
//! Types are immutable values. "Mutating" a type always yields a new value;
//! composite types carry a stable identity id so that a rewritten version of
//! a type can be recognized as *the same type with different content*
//! ([`Type::same`]) and substituted wherever the old version occurs. Equality
//! ([`PartialEq`]) is structural and ignores identity — that is what the
//! data-flow fixpoint compares.

mod builtins;
mod environment;

pub use builtins::{array_builtin, string_builtin};
pub use environment::{TypeEnvironment, TypeReport};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::ast::NodeId;

/// Identity of a type instance. Multiple [`Type`] values can share one id;
/// they are then rewrites of the same underlying type.
pub type TypeId = u64;

static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

fn fresh_id() -> TypeId {
    NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed)
}

/// Property map of a record type, keyed by property name.
pub type Properties = IndexMap<String, Type>;

/// A type in the analyzed program.
#[derive(Debug, Clone)]
pub enum Type {
    Number,
    String,
    Boolean,
    Null,
    /// `undefined`: the type of missing values and absent returns.
    Void,
    Any,
    /// A unification placeholder, unique by id.
    Variable(TypeId),
    /// A value that may be `T` or null/undefined.
    Maybe { id: TypeId, of: Box<Type> },
    /// An array with elements of one type.
    Array { id: TypeId, of: Box<Type> },
    /// `Function(this, params) -> return`. Functions with a known body carry
    /// their declaration node and, once produced as a value, the environment
    /// of their declaration site (closures).
    Function {
        id: TypeId,
        this: Box<Type>,
        params: Box<SmallVec<[Type; 4]>>,
        ret: Box<Type>,
        declaration: Option<NodeId>,
        env: Option<Arc<TypeEnvironment>>,
    },
    /// An object: named properties with types.
    Record { id: TypeId, properties: Properties },
}

impl Type {
    pub fn variable() -> Type {
        Type::Variable(fresh_id())
    }

    pub fn maybe(of: Type) -> Type {
        // Maybe<Maybe<T>> never adds information.
        if let Type::Maybe { .. } = of {
            return of;
        }
        Type::Maybe {
            id: fresh_id(),
            of: Box::new(of),
        }
    }

    pub fn array(of: Type) -> Type {
        Type::Array {
            id: fresh_id(),
            of: Box::new(of),
        }
    }

    pub fn function(this: Type, params: impl IntoIterator<Item = Type>, ret: Type) -> Type {
        Type::Function {
            id: fresh_id(),
            this: Box::new(this),
            params: Box::new(params.into_iter().collect()),
            ret: Box::new(ret),
            declaration: None,
            env: None,
        }
    }

    pub fn declared_function(
        this: Type,
        params: impl IntoIterator<Item = Type>,
        ret: Type,
        declaration: NodeId,
    ) -> Type {
        Type::Function {
            id: fresh_id(),
            this: Box::new(this),
            params: Box::new(params.into_iter().collect()),
            ret: Box::new(ret),
            declaration: Some(declaration),
            env: None,
        }
    }

    pub fn record(properties: impl IntoIterator<Item = (String, Type)>) -> Type {
        Type::Record {
            id: fresh_id(),
            properties: properties.into_iter().collect(),
        }
    }

    pub fn empty_record() -> Type {
        Type::record([])
    }

    /// The identity id of the type, if the variant carries one.
    pub fn id(&self) -> Option<TypeId> {
        match self {
            Type::Variable(id)
            | Type::Maybe { id, .. }
            | Type::Array { id, .. }
            | Type::Function { id, .. }
            | Type::Record { id, .. } => Some(*id),
            _ => None,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Type::Variable(_))
    }

    /// A base type is any type that is not a type variable.
    pub fn is_base(&self) -> bool {
        !self.is_variable()
    }

    /// True when both values are the same type *instance*: primitives of the
    /// same kind, or composites sharing an identity id (possibly with
    /// different content after a rewrite).
    pub fn same(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Number, Type::Number)
            | (Type::String, Type::String)
            | (Type::Boolean, Type::Boolean)
            | (Type::Null, Type::Null)
            | (Type::Void, Type::Void)
            | (Type::Any, Type::Any) => true,
            _ => match (self.id(), other.id()) {
                (Some(a), Some(b)) => a == b && discriminant_eq(self, other),
                _ => false,
            },
        }
    }

    /// True when both types are of the same kind, ignoring type parameters
    /// (`Maybe<number>` and `Maybe<string>` are the same kind).
    pub fn is_same_kind(&self, other: &Type) -> bool {
        discriminant_eq(self, other)
    }

    /// A copy with a new identity (and fresh type variables at the top
    /// level). Assigning a fresh copy breaks the identity link, so later
    /// rewrites of the source value do not retroactively change the copy.
    pub fn fresh(&self) -> Type {
        match self {
            Type::Variable(_) => Type::variable(),
            Type::Maybe { of, .. } => Type::Maybe {
                id: fresh_id(),
                of: of.clone(),
            },
            Type::Array { of, .. } => Type::Array {
                id: fresh_id(),
                of: of.clone(),
            },
            Type::Function {
                this,
                params,
                ret,
                declaration,
                env,
                ..
            } => Type::Function {
                id: fresh_id(),
                this: this.clone(),
                params: params.clone(),
                ret: ret.clone(),
                declaration: *declaration,
                env: env.clone(),
            },
            Type::Record { properties, .. } => Type::Record {
                id: fresh_id(),
                properties: properties.clone(),
            },
            primitive => primitive.clone(),
        }
    }

    /// True if `other` occurs anywhere inside this type (including this type
    /// itself), compared by identity.
    pub fn contains(&self, other: &Type) -> bool {
        if self.same(other) {
            return true;
        }
        match self {
            Type::Maybe { of, .. } | Type::Array { of, .. } => of.contains(other),
            Type::Function {
                this, params, ret, ..
            } => {
                this.contains(other)
                    || ret.contains(other)
                    || params.iter().any(|p| p.contains(other))
            }
            Type::Record { properties, .. } => properties.values().any(|p| p.contains(other)),
            _ => false,
        }
    }

    /// The occurs check: true if this type is part of `other`.
    pub fn occurs_in(&self, other: &Type) -> bool {
        other.contains(self)
    }

    /// Replaces every occurrence of `old` (by identity) with `new`,
    /// recursively. Composites keep their id, so the rewritten value remains
    /// `same` as the original.
    pub fn substitute(&self, old: &Type, new: &Type) -> Type {
        if self.same(old) {
            return new.clone();
        }
        match self {
            Type::Maybe { id, of } => {
                let substituted = of.substitute(old, new);
                if substituted == **of {
                    self.clone()
                } else {
                    Type::Maybe {
                        id: *id,
                        of: Box::new(substituted),
                    }
                }
            }
            Type::Array { id, of } => {
                let substituted = of.substitute(old, new);
                if substituted == **of {
                    self.clone()
                } else {
                    Type::Array {
                        id: *id,
                        of: Box::new(substituted),
                    }
                }
            }
            Type::Function {
                id,
                this,
                params,
                ret,
                declaration,
                env,
            } => {
                let new_this = this.substitute(old, new);
                let new_ret = ret.substitute(old, new);
                let new_params: SmallVec<[Type; 4]> =
                    params.iter().map(|p| p.substitute(old, new)).collect();
                if new_this == **this && new_ret == **ret && new_params[..] == params[..] {
                    self.clone()
                } else {
                    Type::Function {
                        id: *id,
                        this: Box::new(new_this),
                        params: Box::new(new_params),
                        ret: Box::new(new_ret),
                        declaration: *declaration,
                        env: env.clone(),
                    }
                }
            }
            Type::Record { id, properties } => {
                let mut changed = false;
                let new_properties: Properties = properties
                    .iter()
                    .map(|(name, ty)| {
                        let substituted = ty.substitute(old, new);
                        if substituted != *ty {
                            changed = true;
                        }
                        (name.clone(), substituted)
                    })
                    .collect();
                if changed {
                    Type::Record {
                        id: *id,
                        properties: new_properties,
                    }
                } else {
                    self.clone()
                }
            }
            _ => self.clone(),
        }
    }

    /// Tests if `other` is a subtype of this type.
    ///
    /// Type variables and `any`/`undefined` admit every type. A maybe type
    /// admits null, undefined and subtypes of its wrapped type. A record
    /// admits records that have at least its properties with subtype-
    /// compatible types.
    pub fn is_subtype(&self, other: &Type) -> bool {
        match self {
            Type::Variable(_) | Type::Any | Type::Void => true,
            Type::Maybe { of, .. } => match other {
                Type::Null | Type::Void => true,
                Type::Maybe { of: other_of, .. } => of.is_subtype(other_of),
                _ => of.is_subtype(other),
            },
            Type::Array { of, .. } => match other {
                Type::Array { of: other_of, .. } => of.is_subtype(other_of),
                _ => false,
            },
            Type::Function {
                this, params, ret, ..
            } => match other {
                Type::Function {
                    this: other_this,
                    params: other_params,
                    ret: other_ret,
                    ..
                } => {
                    params.len() == other_params.len()
                        && this.is_subtype(other_this)
                        && ret.is_subtype(other_ret)
                        && params
                            .iter()
                            .zip(other_params.iter())
                            .all(|(a, b)| a.is_subtype(b))
                }
                _ => false,
            },
            Type::Record { properties, .. } => match other {
                Type::Record {
                    properties: other_properties,
                    ..
                } => properties.iter().all(|(name, ty)| {
                    other_properties
                        .get(name)
                        .is_some_and(|other_ty| ty.is_subtype(other_ty))
                }),
                _ => false,
            },
            primitive => primitive.structural_eq(other),
        }
    }

    /// Structural equality; the `PartialEq` implementation delegates here.
    fn structural_eq(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Number, Type::Number)
            | (Type::String, Type::String)
            | (Type::Boolean, Type::Boolean)
            | (Type::Null, Type::Null)
            | (Type::Void, Type::Void)
            | (Type::Any, Type::Any) => true,
            // A type variable is only equal to itself.
            (Type::Variable(a), Type::Variable(b)) => a == b,
            (Type::Maybe { of: a, .. }, Type::Maybe { of: b, .. })
            | (Type::Array { of: a, .. }, Type::Array { of: b, .. }) => a.structural_eq(b),
            (
                Type::Function {
                    this: this_a,
                    params: params_a,
                    ret: ret_a,
                    ..
                },
                Type::Function {
                    this: this_b,
                    params: params_b,
                    ret: ret_b,
                    ..
                },
            ) => {
                params_a.len() == params_b.len()
                    && this_a.structural_eq(this_b)
                    && ret_a.structural_eq(ret_b)
                    && params_a
                        .iter()
                        .zip(params_b.iter())
                        .all(|(a, b)| a.structural_eq(b))
            }
            (
                Type::Record { properties: a, .. },
                Type::Record { properties: b, .. },
            ) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(name, ty)| b.get(name).is_some_and(|other| ty.structural_eq(other)))
            }
            _ => false,
        }
    }

    // Record-type accessors. They take the property symbol's flags into
    // account: a computed member has no statically known name, so lookups on
    // records answer `any` and rewrites on arrays target the element type.

    /// True if a property access for `name` can succeed on this type.
    pub fn has_property(&self, name: &str, computed: bool) -> bool {
        match self {
            Type::Record { properties, .. } => computed || properties.contains_key(name),
            Type::Array { .. } => {
                computed || is_numeric_name(name) || array_builtin_exists(name)
            }
            Type::String => string_builtin(self, name).is_some(),
            _ => false,
        }
    }

    /// The type of the property `name`, if present.
    pub fn property_type(&self, name: &str, computed: bool) -> Option<Type> {
        match self {
            Type::Record { properties, .. } => {
                if computed {
                    return Some(Type::Any);
                }
                properties.get(name).cloned()
            }
            Type::Array { of, .. } => {
                if computed || is_numeric_name(name) {
                    return Some((**of).clone());
                }
                array_builtin(self, name)
            }
            Type::String => string_builtin(self, name),
            _ => None,
        }
    }

    /// A copy (same identity) with the property set to `ty`; the property
    /// must exist. Writing through a computed name turns a record into `any`
    /// and rewrites an array's element type.
    pub fn with_property_type(&self, name: &str, computed: bool, ty: Type) -> Type {
        match self {
            Type::Record { id, properties } => {
                if computed {
                    return Type::Any;
                }
                let mut new_properties = properties.clone();
                new_properties.insert(name.to_owned(), ty);
                Type::Record {
                    id: *id,
                    properties: new_properties,
                }
            }
            Type::Array { id, .. } => Type::Array {
                id: *id,
                of: Box::new(ty),
            },
            _ => self.clone(),
        }
    }

    /// A copy (same identity) with a new property added.
    pub fn with_added_property(&self, name: &str, ty: Type) -> Type {
        match self {
            Type::Record { id, properties } => {
                let mut new_properties = properties.clone();
                new_properties.insert(name.to_owned(), ty);
                Type::Record {
                    id: *id,
                    properties: new_properties,
                }
            }
            _ => self.clone(),
        }
    }

    /// A function type with new parameter/return types but the declaration
    /// and environment of this one, under a new identity. No-op for other
    /// variants.
    pub fn rebuilt_function(
        &self,
        this: Type,
        params: impl IntoIterator<Item = Type>,
        ret: Type,
    ) -> Type {
        match self {
            Type::Function {
                declaration, env, ..
            } => Type::Function {
                id: fresh_id(),
                this: Box::new(this),
                params: Box::new(params.into_iter().collect()),
                ret: Box::new(ret),
                declaration: *declaration,
                env: env.clone(),
            },
            _ => self.clone(),
        }
    }

    /// A copy of this function type carrying `env` as its declaration
    /// environment. No-op for other variants.
    pub fn with_env(&self, environment: Arc<TypeEnvironment>) -> Type {
        match self {
            Type::Function {
                id,
                this,
                params,
                ret,
                declaration,
                ..
            } => Type::Function {
                id: *id,
                this: this.clone(),
                params: params.clone(),
                ret: ret.clone(),
                declaration: *declaration,
                env: Some(environment),
            },
            _ => self.clone(),
        }
    }
}

fn discriminant_eq(a: &Type, b: &Type) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

fn is_numeric_name(name: &str) -> bool {
    name.parse::<f64>().is_ok()
}

fn array_builtin_exists(name: &str) -> bool {
    array_builtin(&Type::array(Type::Any), name).is_some()
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.structural_eq(other)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Number => write!(f, "number"),
            Type::String => write!(f, "string"),
            Type::Boolean => write!(f, "boolean"),
            Type::Null => write!(f, "null"),
            Type::Void => write!(f, "undefined"),
            Type::Any => write!(f, "any"),
            Type::Variable(id) => write!(f, "@({id})"),
            Type::Maybe { of, .. } => write!(f, "Maybe<{of}>"),
            Type::Array { of, .. } => write!(f, "{of}[]"),
            Type::Function {
                this, params, ret, ..
            } => {
                let params: Vec<String> = params.iter().map(Type::to_string).collect();
                write!(f, "{this}.({}) -> {ret}", params.join(", "))
            }
            Type::Record { properties, .. } => {
                let rendered: Vec<String> = properties
                    .iter()
                    .map(|(name, ty)| format!("{name}: {ty}"))
                    .collect();
                write!(f, "{{{}}}", rendered.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_equality() {
        assert_eq!(Type::Number, Type::Number);
        assert_ne!(Type::Number, Type::String);
        assert_ne!(Type::Null, Type::Void);
    }

    #[test]
    fn test_type_variables_are_identity_unique() {
        let a = Type::variable();
        let b = Type::variable();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_structural_equality_ignores_identity() {
        let a = Type::array(Type::Number);
        let b = Type::array(Type::Number);
        assert_eq!(a, b);
        assert!(!a.same(&b));
        assert!(a.same(&a.clone()));
    }

    #[test]
    fn test_fresh_breaks_identity() {
        let record = Type::record([("name".to_owned(), Type::String)]);
        let copy = record.fresh();
        assert_eq!(record, copy);
        assert!(!record.same(&copy));
    }

    #[test]
    fn test_substitute_rewrites_nested_occurrences() {
        let variable = Type::variable();
        let array = Type::array(variable.clone());
        let substituted = array.substitute(&variable, &Type::Number);
        assert_eq!(substituted, Type::array(Type::Number));
        // The rewrite keeps the array's identity.
        assert!(substituted.same(&array));
    }

    #[test]
    fn test_substitute_keeps_unrelated_types() {
        let variable = Type::variable();
        let record = Type::record([("age".to_owned(), Type::Number)]);
        let substituted = record.substitute(&variable, &Type::String);
        assert_eq!(substituted, record);
    }

    #[test]
    fn test_occurs_check() {
        let variable = Type::variable();
        let maybe = Type::maybe(variable.clone());
        assert!(variable.occurs_in(&maybe));
        assert!(!variable.occurs_in(&Type::maybe(Type::Number)));
    }

    #[test]
    fn test_maybe_flattens() {
        let maybe = Type::maybe(Type::maybe(Type::Number));
        assert_eq!(maybe, Type::maybe(Type::Number));
    }

    #[test]
    fn test_subtype_maybe_admits_null_and_inner() {
        let maybe_number = Type::maybe(Type::Number);
        assert!(maybe_number.is_subtype(&Type::Null));
        assert!(maybe_number.is_subtype(&Type::Void));
        assert!(maybe_number.is_subtype(&Type::Number));
        assert!(!maybe_number.is_subtype(&Type::String));
    }

    #[test]
    fn test_subtype_record_width() {
        let narrow = Type::record([("name".to_owned(), Type::String)]);
        let wide = Type::record([
            ("name".to_owned(), Type::String),
            ("age".to_owned(), Type::Number),
        ]);
        assert!(narrow.is_subtype(&wide));
        assert!(!wide.is_subtype(&narrow));
    }

    #[test]
    fn test_record_property_rewrite_keeps_identity() {
        let record = Type::record([("name".to_owned(), Type::Void)]);
        let updated = record.with_property_type("name", false, Type::String);
        assert!(record.same(&updated));
        assert_ne!(record, updated);
        assert_eq!(updated.property_type("name", false), Some(Type::String));
    }

    #[test]
    fn test_computed_record_access_is_any() {
        let record = Type::record([("name".to_owned(), Type::String)]);
        assert_eq!(record.property_type("whatever", true), Some(Type::Any));
        assert_eq!(record.property_type("missing", false), None);
    }

    #[test]
    fn test_numeric_array_access_yields_element() {
        let array = Type::array(Type::String);
        assert_eq!(array.property_type("0", false), Some(Type::String));
        assert_eq!(array.property_type("length", false), Some(Type::Number));
    }
}

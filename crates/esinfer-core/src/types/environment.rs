//! The type environment: an immutable map from symbols to types.
//!
//! Every operation returns a new environment; an environment that has been
//! observed never changes. The data-flow fixpoint depends on that contract:
//! it compares old and new states by structural equality.

use indexmap::IndexMap;
use serde::Serialize;

use crate::semantic::symbol::SymbolId;
use crate::semantic::symbol_table::SymbolTable;
use crate::types::Type;

/// Immutable symbol → type map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeEnvironment {
    mappings: IndexMap<SymbolId, Type>,
}

impl TypeEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    /// A new environment that additionally maps `symbol` to `ty`.
    #[must_use]
    pub fn set_type(&self, symbol: SymbolId, ty: Type) -> TypeEnvironment {
        let mut mappings = self.mappings.clone();
        mappings.insert(symbol, ty);
        TypeEnvironment { mappings }
    }

    pub fn get_type(&self, symbol: SymbolId) -> Option<&Type> {
        self.mappings.get(&symbol)
    }

    pub fn has_type(&self, symbol: SymbolId) -> bool {
        self.mappings.contains_key(&symbol)
    }

    pub fn iter(&self) -> impl Iterator<Item = (SymbolId, &Type)> + '_ {
        self.mappings.iter().map(|(symbol, ty)| (*symbol, ty))
    }

    /// A new environment with every occurrence of `old` — including
    /// occurrences nested inside parametrized and record types — replaced by
    /// `new`. Rewritten mappings are themselves propagated until a fixpoint,
    /// so aliased composites stay consistent.
    #[must_use]
    pub fn substitute(&self, old: &Type, new: &Type) -> TypeEnvironment {
        if old.same(new) && old == new {
            return self.clone();
        }

        let mut mappings = self.mappings.clone();
        let mut pending = vec![(old.clone(), new.clone())];

        while let Some((from, to)) = pending.pop() {
            for slot in mappings.values_mut() {
                let substituted = slot.substitute(&from, &to);
                if substituted != *slot {
                    let previous = std::mem::replace(slot, substituted.clone());
                    // The rewritten type may itself occur inside other
                    // mappings; queue it unless it was the search target.
                    if !previous.same(&from) {
                        pending.push((previous, substituted));
                    }
                }
            }
        }

        if mappings == self.mappings {
            self.clone()
        } else {
            TypeEnvironment { mappings }
        }
    }

    /// A new environment containing this environment plus every mapping of
    /// `other` whose symbol is not yet bound. Existing mappings win.
    #[must_use]
    pub fn add(&self, other: &TypeEnvironment) -> TypeEnvironment {
        let mut mappings = self.mappings.clone();
        for (symbol, ty) in &other.mappings {
            if !mappings.contains_key(symbol) {
                mappings.insert(*symbol, ty.clone());
            }
        }
        TypeEnvironment { mappings }
    }

    /// A new environment where each symbol bound here (except the excluded
    /// ones) takes the type `other` has for it. The replacement runs through
    /// [`TypeEnvironment::substitute`], so nested occurrences of the old type
    /// are rewritten as well. Mappings only present in `other` are not added.
    #[must_use]
    pub fn replace_types(
        &self,
        other: &TypeEnvironment,
        excluded: &[SymbolId],
    ) -> TypeEnvironment {
        let mut result = self.clone();
        for (symbol, ty) in &self.mappings {
            if excluded.contains(symbol) {
                continue;
            }
            if let Some(new_ty) = other.get_type(*symbol) {
                if new_ty != ty {
                    result = result.substitute(ty, new_ty);
                }
            }
        }
        result
    }

    /// Renders the environment for diagnostics, sorted by symbol name.
    pub fn dump(&self, symbols: &SymbolTable) -> String {
        let mut lines: Vec<String> = self
            .mappings
            .iter()
            .map(|(symbol, ty)| format!("{} -> {}", symbols.name(*symbol), ty))
            .collect();
        lines.sort();
        lines.join("\n")
    }

    /// The serializable form of the environment.
    pub fn report(&self, symbols: &SymbolTable) -> TypeReport {
        let mut bindings: Vec<TypeBinding> = self
            .mappings
            .iter()
            .map(|(symbol, ty)| TypeBinding {
                name: symbols.name(*symbol),
                ty: ty.to_string(),
            })
            .collect();
        bindings.sort_by(|a, b| a.name.cmp(&b.name));
        TypeReport { bindings }
    }
}

/// Machine-readable dump of an environment: symbol names with the rendered
/// form of their inferred type.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TypeReport {
    pub bindings: Vec<TypeBinding>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TypeBinding {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl TypeReport {
    /// The rendered type of `name`, if the report contains it.
    pub fn type_of(&self, name: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|binding| binding.name == name)
            .map(|binding| binding.ty.as_str())
    }
}

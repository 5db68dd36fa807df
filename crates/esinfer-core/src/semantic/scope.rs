//! Lexical scopes.

use fnv::FnvHashMap;
use indexmap::IndexMap;

use crate::ast::NodeId;
use crate::semantic::symbol::SymbolId;

/// Index of a scope in the scope tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub const GLOBAL: ScopeId = ScopeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Default)]
struct ScopeData {
    parent: Option<ScopeId>,
    children: Vec<ScopeId>,
    symbols: IndexMap<String, SymbolId>,
}

/// The tree of lexical scopes, plus a side table mapping scope-introducing
/// nodes (program, functions, blocks) to their scope.
///
/// Name lookup checks the own symbols first, then parent scopes transitively.
/// A scope never holds two symbols with the same name.
#[derive(Debug)]
pub struct ScopeTree {
    scopes: Vec<ScopeData>,
    by_node: FnvHashMap<NodeId, ScopeId>,
}

impl ScopeTree {
    /// Creates a tree containing only the global scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![ScopeData::default()],
            by_node: FnvHashMap::default(),
        }
    }

    pub fn global(&self) -> ScopeId {
        ScopeId::GLOBAL
    }

    /// Creates a child of `parent` and returns its id.
    pub fn create_child(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(ScopeData {
            parent: Some(parent),
            children: Vec::new(),
            symbols: IndexMap::new(),
        });
        self.scopes[parent.index()].children.push(id);
        id
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.index()].parent
    }

    pub fn children(&self, scope: ScopeId) -> &[ScopeId] {
        &self.scopes[scope.index()].children
    }

    /// Associates a scope-introducing node with its scope.
    pub fn assign_node(&mut self, node: NodeId, scope: ScopeId) {
        self.by_node.insert(node, scope);
    }

    /// The scope introduced by `node`, if it introduces one.
    pub fn scope_of(&self, node: NodeId) -> Option<ScopeId> {
        self.by_node.get(&node).copied()
    }

    /// Adds a symbol to the scope. Panics if the name is already bound there;
    /// callers resolve before declaring.
    pub fn add_symbol(&mut self, scope: ScopeId, name: &str, symbol: SymbolId) {
        let data = &mut self.scopes[scope.index()];
        assert!(
            !data.symbols.contains_key(name),
            "another symbol with the name {name} already exists"
        );
        data.symbols.insert(name.to_owned(), symbol);
    }

    /// Rebinds `name` in the scope to a different symbol (hoisting takeover).
    pub fn replace_symbol(&mut self, scope: ScopeId, name: &str, symbol: SymbolId) {
        let data = &mut self.scopes[scope.index()];
        assert!(
            data.symbols.contains_key(name),
            "can only replace a symbol contained in this scope"
        );
        data.symbols.insert(name.to_owned(), symbol);
    }

    pub fn has_own_symbol(&self, scope: ScopeId, name: &str) -> bool {
        self.scopes[scope.index()].symbols.contains_key(name)
    }

    pub fn get_own_symbol(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        self.scopes[scope.index()].symbols.get(name).copied()
    }

    pub fn has_symbol(&self, scope: ScopeId, name: &str) -> bool {
        self.resolve_symbol(scope, name).is_some()
    }

    /// Resolves `name` in the scope or any ancestor scope.
    pub fn resolve_symbol(&self, scope: ScopeId, name: &str) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(scope) = current {
            if let Some(symbol) = self.get_own_symbol(scope, name) {
                return Some(symbol);
            }
            current = self.parent(scope);
        }
        None
    }

    /// Symbols declared directly in the scope, in declaration order.
    pub fn own_symbols(&self, scope: ScopeId) -> impl Iterator<Item = SymbolId> + '_ {
        self.scopes[scope.index()].symbols.values().copied()
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

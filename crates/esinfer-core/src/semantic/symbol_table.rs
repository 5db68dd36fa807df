//! Symbol arena and the node → symbol side table.

use std::cell::RefCell;

use fnv::FnvHashMap;

use crate::ast::NodeId;
use crate::semantic::symbol::{Symbol, SymbolFlags, SymbolId};

/// Owns every symbol of a program and resolves AST nodes to their symbol.
///
/// The arena is append-only and single-writer: the extraction pass fills it,
/// and during inference the only mutation is minting short-lived synthetic
/// symbols (call-site scratch bindings), which is why the storage sits behind
/// a `RefCell` while the public API stays `&self`.
#[derive(Debug)]
pub struct SymbolTable {
    symbols: RefCell<Vec<Symbol>>,
    by_node: RefCell<FnvHashMap<NodeId, SymbolId>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        let table = Self {
            symbols: RefCell::new(Vec::new()),
            by_node: RefCell::new(FnvHashMap::default()),
        };
        // Well-known synthetic symbols occupy fixed slots.
        let ret = table.create("return", SymbolFlags::RETURN);
        debug_assert_eq!(ret, SymbolId::RETURN);
        let computed = table.create(
            "<computed>",
            SymbolFlags::PROPERTY | SymbolFlags::COMPUTED | SymbolFlags::ANONYMOUS,
        );
        debug_assert_eq!(computed, SymbolId::COMPUTED);
        table
    }

    /// Creates a new symbol and returns its id.
    pub fn create(&self, name: impl Into<String>, flags: SymbolFlags) -> SymbolId {
        let mut symbols = self.symbols.borrow_mut();
        let id = SymbolId(symbols.len() as u32);
        symbols.push(Symbol::new(name, flags));
        id
    }

    pub fn name(&self, id: SymbolId) -> String {
        self.symbols.borrow()[id.index()].name.clone()
    }

    pub fn flags(&self, id: SymbolId) -> SymbolFlags {
        self.symbols.borrow()[id.index()].flags
    }

    pub fn set_flags(&self, id: SymbolId, flags: SymbolFlags) {
        self.symbols.borrow_mut()[id.index()].flags = flags;
    }

    pub fn declaration(&self, id: SymbolId) -> Option<NodeId> {
        self.symbols.borrow()[id.index()].declaration
    }

    pub fn set_declaration(&self, id: SymbolId, node: NodeId) {
        self.symbols.borrow_mut()[id.index()].declaration = Some(node);
    }

    pub fn value_declaration(&self, id: SymbolId) -> Option<NodeId> {
        self.symbols.borrow()[id.index()].value_declaration
    }

    pub fn set_value_declaration(&self, id: SymbolId, node: NodeId) {
        self.symbols.borrow_mut()[id.index()].value_declaration = Some(node);
    }

    /// Records `node` as a reference to the symbol.
    pub fn add_reference(&self, id: SymbolId, node: NodeId) {
        let mut symbols = self.symbols.borrow_mut();
        let references = &mut symbols[id.index()].references;
        if !references.contains(&node) {
            references.push(node);
        }
    }

    pub fn references(&self, id: SymbolId) -> Vec<NodeId> {
        self.symbols.borrow()[id.index()].references.clone()
    }

    pub fn is_unresolved(&self, id: SymbolId) -> bool {
        self.symbols.borrow()[id.index()].unresolved
    }

    pub fn set_unresolved(&self, id: SymbolId, unresolved: bool) {
        self.symbols.borrow_mut()[id.index()].unresolved = unresolved;
    }

    pub fn has_member(&self, id: SymbolId, name: &str) -> bool {
        self.symbols.borrow()[id.index()].members.contains_key(name)
    }

    pub fn member(&self, id: SymbolId, name: &str) -> Option<SymbolId> {
        self.symbols.borrow()[id.index()].members.get(name).copied()
    }

    /// Adds `member` to the member map of `id`. Panics on duplicate names;
    /// callers look up before adding.
    pub fn add_member(&self, id: SymbolId, member: SymbolId) {
        let name = self.name(member);
        let mut symbols = self.symbols.borrow_mut();
        let members = &mut symbols[id.index()].members;
        assert!(
            !members.contains_key(&name),
            "a member with the name {name} already exists"
        );
        members.insert(name, member);
    }

    /// Associates an AST node with its symbol.
    pub fn assign(&self, node: NodeId, symbol: SymbolId) {
        self.by_node.borrow_mut().insert(node, symbol);
    }

    /// The symbol previously assigned to the node, if any.
    pub fn symbol_of(&self, node: NodeId) -> Option<SymbolId> {
        self.by_node.borrow().get(&node).copied()
    }

    pub fn len(&self) -> usize {
        self.symbols.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.borrow().is_empty()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

//! Symbols: named bindings discovered by the extraction pass.

use bitflags::bitflags;
use indexmap::IndexMap;

use crate::ast::NodeId;

bitflags! {
    /// Classification of a symbol. The bits are disjoint; compound queries
    /// like "is a variable" test the union.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SymbolFlags: u32 {
        const NONE = 0;
        /// `var` binding or function parameter.
        const FUNCTION_SCOPED_VARIABLE = 1 << 0;
        /// `let` or `const` binding.
        const BLOCK_SCOPED_VARIABLE = 1 << 1;
        /// Property of an object.
        const PROPERTY = 1 << 2;
        /// Function binding.
        const FUNCTION = 1 << 3;
        /// The synthetic return-value binding of a function.
        const RETURN = 1 << 4;
        /// Bracket-accessed member with no statically known name.
        const COMPUTED = 1 << 5;
        /// Binding without a user-visible name.
        const ANONYMOUS = 1 << 6;
        /// Function declaration, visible before its lexical position.
        const HOISTED = 1 << 7;
        const UNKNOWN = 1 << 31;
    }
}

impl SymbolFlags {
    pub const VARIABLE: SymbolFlags = SymbolFlags::FUNCTION_SCOPED_VARIABLE
        .union(SymbolFlags::BLOCK_SCOPED_VARIABLE);

    pub fn is_variable(self) -> bool {
        self.intersects(SymbolFlags::VARIABLE)
    }

    pub fn is_computed(self) -> bool {
        self.contains(SymbolFlags::COMPUTED)
    }

    pub fn is_hoisted(self) -> bool {
        self.contains(SymbolFlags::HOISTED)
    }
}

/// Index of a symbol in the symbol table arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub u32);

impl SymbolId {
    /// The synthetic binding for a function's return value.
    pub const RETURN: SymbolId = SymbolId(0);
    /// The shared binding for computed (bracket) member accesses.
    pub const COMPUTED: SymbolId = SymbolId(1);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named, possibly anonymous binding. Two occurrences of one name in the
/// same scope share a single symbol; that aliasing is how hoisting and
/// use-before-declaration are modeled.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub flags: SymbolFlags,
    /// Node that declares the symbol, if any. Symbols without a declaration
    /// were referenced but never declared or assigned.
    pub declaration: Option<NodeId>,
    /// First node that assigns a value to the symbol.
    pub value_declaration: Option<NodeId>,
    /// Nodes referencing the symbol.
    pub references: Vec<NodeId>,
    /// Member symbols, keyed by member name (`x.y` puts `y` here for `x`).
    pub members: IndexMap<String, SymbolId>,
    /// Set while a reference has been seen but no declaration yet; a later
    /// hoisted declaration of the same name takes the symbol over.
    pub unresolved: bool,
}

impl Symbol {
    pub fn new(name: impl Into<String>, flags: SymbolFlags) -> Self {
        Self {
            name: name.into(),
            flags,
            declaration: None,
            value_declaration: None,
            references: Vec::new(),
            members: IndexMap::new(),
            unresolved: false,
        }
    }
}

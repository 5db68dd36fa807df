//! Symbol extraction: one pass over the AST that builds the scope tree, the
//! symbol arena and the node → symbol table.
//!
//! Identifiers are never resolved from their own node; the enclosing
//! construct decides what an identifier occurrence means (declaration,
//! reference, member name), so each handler resolves exactly the identifier
//! children it owns.

use crate::ast::{Ast, NodeId, NodeKind};
use crate::error::ExtractionError;
use crate::semantic::scope::{ScopeId, ScopeTree};
use crate::semantic::symbol::{SymbolFlags, SymbolId};
use crate::semantic::symbol_table::SymbolTable;

pub struct SymbolExtractor<'a> {
    ast: &'a Ast,
    scopes: ScopeTree,
    symbols: SymbolTable,
    scope: ScopeId,
}

impl<'a> SymbolExtractor<'a> {
    /// Runs extraction over the whole tree. `prepare` is called with the
    /// global scope before traversal so built-in globals can be declared.
    pub fn run(
        ast: &'a Ast,
        prepare: impl FnOnce(&mut ScopeTree, &SymbolTable),
    ) -> Result<(ScopeTree, SymbolTable), ExtractionError> {
        let mut extractor = Self {
            ast,
            scopes: ScopeTree::new(),
            symbols: SymbolTable::new(),
            scope: ScopeId::GLOBAL,
        };
        prepare(&mut extractor.scopes, &extractor.symbols);
        extractor.visit(ast.root())?;
        Ok((extractor.scopes, extractor.symbols))
    }

    fn visit(&mut self, node: NodeId) -> Result<(), ExtractionError> {
        match self.ast.kind(node) {
            NodeKind::Program { .. } => {
                self.scopes.assign_node(node, self.scope);
                self.visit_children(node)?;
            }
            NodeKind::BlockStatement { .. } => {
                self.enter_scope(node);
                self.visit_children(node)?;
                self.exit_scope();
            }
            NodeKind::ExpressionStatement { expression } => {
                self.resolve_identifiers(&[Some(*expression)]);
                self.visit_children(node)?;
            }
            NodeKind::IfStatement { test, .. } => {
                self.resolve_identifiers(&[Some(*test)]);
                self.visit_children(node)?;
            }
            NodeKind::SwitchStatement { discriminant, .. } => {
                self.resolve_identifiers(&[Some(*discriminant)]);
                self.visit_children(node)?;
            }
            NodeKind::SwitchCase { test, .. } => {
                self.resolve_identifiers(&[*test]);
                self.visit_children(node)?;
            }
            NodeKind::ReturnStatement { argument } => {
                self.resolve_identifiers(&[*argument]);
                self.visit_children(node)?;
            }
            NodeKind::ThrowStatement { argument } => {
                self.resolve_identifiers(&[Some(*argument)]);
                self.visit_children(node)?;
            }
            NodeKind::WhileStatement { test, .. } | NodeKind::DoWhileStatement { test, .. } => {
                self.resolve_identifiers(&[Some(*test)]);
                self.visit_children(node)?;
            }
            NodeKind::ForStatement {
                init, test, update, ..
            } => {
                self.resolve_identifiers(&[*init, *test, *update]);
                self.visit_children(node)?;
            }
            NodeKind::ForInStatement { left, right, .. }
            | NodeKind::ForOfStatement { left, right, .. } => {
                self.resolve_identifiers(&[Some(*left), Some(*right)]);
                self.visit_children(node)?;
            }
            NodeKind::CatchClause { param, .. } => {
                self.resolve_identifiers(&[*param]);
                self.visit_children(node)?;
            }
            NodeKind::VariableDeclarator { id, init } => {
                let symbol = self.declare_identifier(*id, SymbolFlags::VARIABLE);
                self.symbols.set_declaration(symbol, node);
                if let Some(init) = init {
                    self.resolve_identifiers(&[Some(*init)]);
                    self.symbols.set_value_declaration(symbol, *init);
                }
                self.visit_children(node)?;
            }
            NodeKind::FunctionDeclaration { .. } | NodeKind::FunctionExpression { .. } => {
                self.enter_function(node);
                self.visit_children(node)?;
                self.exit_scope();
            }
            NodeKind::ArrowFunctionExpression { body, .. } => {
                self.enter_function(node);
                // The body may be a bare identifier expression.
                self.resolve_identifiers(&[Some(*body)]);
                self.visit_children(node)?;
                self.exit_scope();
            }
            NodeKind::ThisExpression => {
                self.resolve_this(node);
            }
            NodeKind::ArrayExpression { elements } => {
                let elements: Vec<_> = elements.iter().copied().map(Some).collect();
                self.resolve_identifiers(&elements);
                self.visit_children(node)?;
            }
            NodeKind::ObjectExpression { .. } => {
                let symbol = self.object_symbol(node);
                self.symbols.add_reference(symbol, node);
                self.symbols.assign(node, symbol);
                self.visit_children(node)?;
            }
            NodeKind::ObjectProperty {
                key,
                value,
                computed,
            } => {
                if *computed {
                    return Err(ExtractionError::UnsupportedNode {
                        kind: "computed object property",
                        node,
                    });
                }
                let member = self.declare_object_member(node, *key)?;
                self.symbols.set_value_declaration(member, *value);
                self.resolve_identifiers(&[Some(*value)]);
                self.visit_children(node)?;
            }
            NodeKind::MemberExpression { .. } => {
                self.resolve_member(node)?;
                self.visit_children(node)?;
            }
            NodeKind::AssignmentExpression { .. } => {
                self.resolve_assignment(node)?;
                self.visit_children(node)?;
            }
            NodeKind::SequenceExpression { expressions } => {
                let expressions: Vec<_> = expressions.iter().copied().map(Some).collect();
                self.resolve_identifiers(&expressions);
                self.visit_children(node)?;
            }
            NodeKind::UnaryExpression { argument, .. }
            | NodeKind::UpdateExpression { argument, .. } => {
                self.resolve_identifiers(&[Some(*argument)]);
                self.visit_children(node)?;
            }
            NodeKind::BinaryExpression { left, right, .. }
            | NodeKind::LogicalExpression { left, right, .. } => {
                self.resolve_identifiers(&[Some(*left), Some(*right)]);
                self.visit_children(node)?;
            }
            NodeKind::ConditionalExpression {
                test,
                consequent,
                alternate,
            } => {
                self.resolve_identifiers(&[Some(*test), Some(*consequent), Some(*alternate)]);
                self.visit_children(node)?;
            }
            NodeKind::CallExpression { callee, arguments }
            | NodeKind::NewExpression { callee, arguments } => {
                let mut targets = vec![Some(*callee)];
                targets.extend(arguments.iter().copied().map(Some));
                self.resolve_identifiers(&targets);
                self.visit_children(node)?;
            }
            NodeKind::TemplateLiteral { expressions, .. } => {
                let expressions: Vec<_> = expressions.iter().copied().map(Some).collect();
                self.resolve_identifiers(&expressions);
                self.visit_children(node)?;
            }
            NodeKind::TaggedTemplateExpression { tag, .. } => {
                self.resolve_identifiers(&[Some(*tag)]);
                self.visit_children(node)?;
            }
            // No symbol work of their own; children still need the walk.
            NodeKind::VariableDeclaration { .. }
            | NodeKind::LabeledStatement { .. }
            | NodeKind::TryStatement { .. } => {
                self.visit_children(node)?;
            }
            NodeKind::EmptyStatement
            | NodeKind::BreakStatement { .. }
            | NodeKind::ContinueStatement { .. }
            | NodeKind::Identifier { .. }
            | NodeKind::NumberLiteral { .. }
            | NodeKind::StringLiteral { .. }
            | NodeKind::BooleanLiteral { .. }
            | NodeKind::NullLiteral => {}
        }
        Ok(())
    }

    fn visit_children(&mut self, node: NodeId) -> Result<(), ExtractionError> {
        for child in self.ast.children(node) {
            self.visit(child)?;
        }
        Ok(())
    }

    fn enter_scope(&mut self, node: NodeId) {
        self.scope = self.scopes.create_child(self.scope);
        self.scopes.assign_node(node, self.scope);
    }

    fn exit_scope(&mut self) {
        self.scope = self
            .scopes
            .parent(self.scope)
            .expect("cannot exit the global scope");
    }

    /// Declares a function in the enclosing scope and its parameters in a new
    /// child scope. The caller exits the scope after the body walk.
    fn enter_function(&mut self, node: NodeId) {
        let (id, params) = match self.ast.kind(node) {
            NodeKind::FunctionDeclaration { id, params, .. }
            | NodeKind::FunctionExpression { id, params, .. } => (*id, params.clone()),
            NodeKind::ArrowFunctionExpression { params, .. } => (None, params.clone()),
            _ => unreachable!("enter_function on a non-function node"),
        };

        let symbol = match id {
            Some(id) => {
                let flags = if matches!(self.ast.kind(node), NodeKind::FunctionDeclaration { .. })
                {
                    SymbolFlags::FUNCTION | SymbolFlags::HOISTED
                } else {
                    SymbolFlags::FUNCTION
                };
                self.declare_identifier(id, flags)
            }
            None => self
                .symbols
                .create(anonymous_name(self.ast, node, "anonymous"), SymbolFlags::FUNCTION),
        };
        self.symbols.set_declaration(symbol, node);
        self.symbols.set_value_declaration(symbol, node);
        self.symbols.assign(node, symbol);

        self.enter_scope(node);

        for param in params {
            let param_symbol = self.declare_identifier(param, SymbolFlags::VARIABLE);
            self.symbols.set_declaration(param_symbol, param);
        }
    }

    /// `this` binds to the enclosing function's scope (or the global scope at
    /// the top level); the symbol is created on first use.
    fn resolve_this(&mut self, node: NodeId) {
        let mut enclosing = self.ast.parent(node);
        while let Some(current) = enclosing {
            if self.ast.kind(current).is_function() {
                break;
            }
            enclosing = self.ast.parent(current);
        }

        let function_scope = enclosing
            .and_then(|function| self.scopes.scope_of(function))
            .unwrap_or(ScopeId::GLOBAL);

        let this = match self.scopes.get_own_symbol(function_scope, "this") {
            Some(existing) => existing,
            None => {
                let created = self.symbols.create("this", SymbolFlags::VARIABLE);
                self.scopes.add_symbol(function_scope, "this", created);
                created
            }
        };

        self.symbols.assign(node, this);
        self.symbols.add_reference(this, node);
    }

    /// The symbol an object literal aliases: the declared variable, the
    /// assignment target, the enclosing property, or a fresh anonymous
    /// binding when the literal appears in any other position.
    fn object_symbol(&mut self, node: NodeId) -> SymbolId {
        let parent = self.ast.parent(node);
        match parent.map(|p| self.ast.kind(p)) {
            Some(NodeKind::VariableDeclarator { id, .. }) => {
                self.resolve_identifier(*id, SymbolFlags::UNKNOWN)
            }
            Some(NodeKind::AssignmentExpression { .. }) => self
                .resolve_assignment(parent.expect("assignment parent"))
                .unwrap_or_else(|_| {
                    self.symbols.create(
                        anonymous_name(self.ast, node, "anonymous object"),
                        SymbolFlags::ANONYMOUS,
                    )
                }),
            Some(NodeKind::ObjectProperty { .. }) => {
                let property = parent.expect("property parent");
                self.symbols
                    .symbol_of(property)
                    .expect("object property visited before its value")
            }
            _ => self.symbols.create(
                anonymous_name(self.ast, node, "anonymous object"),
                SymbolFlags::ANONYMOUS,
            ),
        }
    }

    fn declare_object_member(
        &mut self,
        property: NodeId,
        key: NodeId,
    ) -> Result<SymbolId, ExtractionError> {
        let object = self
            .ast
            .parent(property)
            .and_then(|object| self.symbols.symbol_of(object))
            .expect("object expression visited before its properties");

        let name = match self.ast.kind(key) {
            NodeKind::Identifier { name } => name.clone(),
            NodeKind::StringLiteral { value } => value.clone(),
            NodeKind::NumberLiteral { value } => number_name(*value),
            _ => {
                return Err(ExtractionError::UnsupportedNode {
                    kind: self.ast.kind(key).name(),
                    node: key,
                })
            }
        };

        let member = match self.symbols.member(object, &name) {
            Some(existing) => existing,
            None => {
                let created = self.symbols.create(name, SymbolFlags::PROPERTY);
                self.symbols.add_member(object, created);
                created
            }
        };

        self.symbols.set_declaration(member, property);
        self.symbols.assign(property, member);
        Ok(member)
    }

    /// Resolves both sides of a member expression. The object side is rooted
    /// in an identifier, another member chain, `this`, or an anonymous value;
    /// the property becomes a member symbol of the object symbol.
    fn resolve_member(&mut self, node: NodeId) -> Result<SymbolId, ExtractionError> {
        let (object_node, property_node, computed) = match self.ast.kind(node) {
            NodeKind::MemberExpression {
                object,
                property,
                computed,
            } => (*object, *property, *computed),
            _ => unreachable!("resolve_member on a non-member node"),
        };

        let object = match self.ast.kind(object_node) {
            NodeKind::Identifier { .. } => {
                self.resolve_identifier(object_node, SymbolFlags::VARIABLE)
            }
            NodeKind::MemberExpression { .. } => self.resolve_member(object_node)?,
            NodeKind::ThisExpression => {
                self.resolve_this(object_node);
                self.symbols
                    .symbol_of(object_node)
                    .expect("this resolution assigns a symbol")
            }
            _ => {
                // e.g. "test".length or call({}).member
                let anonymous = self.symbols.create(
                    anonymous_name(self.ast, node, "anonymous"),
                    SymbolFlags::ANONYMOUS,
                );
                self.symbols.assign(object_node, anonymous);
                anonymous
            }
        };

        let member = match self.ast.kind(property_node) {
            NodeKind::StringLiteral { value } => {
                self.member_of(object, &value.clone(), SymbolFlags::PROPERTY)
            }
            NodeKind::NumberLiteral { value } => {
                self.member_of(object, &number_name(*value), SymbolFlags::PROPERTY)
            }
            _ if computed => SymbolId::COMPUTED,
            NodeKind::Identifier { name } => {
                self.member_of(object, &name.clone(), SymbolFlags::PROPERTY)
            }
            _ => {
                return Err(ExtractionError::UnsupportedNode {
                    kind: self.ast.kind(property_node).name(),
                    node: property_node,
                })
            }
        };

        self.symbols.assign(property_node, member);
        self.symbols.assign(object_node, object);
        self.symbols.add_reference(member, property_node);

        Ok(member)
    }

    fn member_of(&mut self, object: SymbolId, name: &str, flags: SymbolFlags) -> SymbolId {
        match self.symbols.member(object, name) {
            Some(existing) => existing,
            None => {
                let created = self.symbols.create(name, flags);
                self.symbols.add_member(object, created);
                created
            }
        }
    }

    fn resolve_assignment(&mut self, node: NodeId) -> Result<SymbolId, ExtractionError> {
        let (left, right) = match self.ast.kind(node) {
            NodeKind::AssignmentExpression { left, right, .. } => (*left, *right),
            _ => unreachable!("resolve_assignment on a non-assignment node"),
        };

        let assignee = match self.ast.kind(left) {
            NodeKind::Identifier { .. } => self.resolve_identifier(left, SymbolFlags::VARIABLE),
            NodeKind::MemberExpression { .. } => {
                let member = self.resolve_member(left)?;
                if self.symbols.declaration(member).is_none() {
                    self.symbols.set_declaration(member, right);
                }
                member
            }
            other => {
                return Err(ExtractionError::UnsupportedAssignmentTarget {
                    kind: other.name(),
                    node,
                })
            }
        };

        if self.symbols.value_declaration(assignee).is_none() {
            self.symbols.set_value_declaration(assignee, node);
        }
        self.resolve_identifiers(&[Some(right)]);

        Ok(assignee)
    }

    fn resolve_identifiers(&mut self, nodes: &[Option<NodeId>]) {
        for node in nodes.iter().flatten() {
            if matches!(self.ast.kind(*node), NodeKind::Identifier { .. }) {
                self.resolve_identifier(*node, SymbolFlags::VARIABLE);
            }
        }
    }

    /// Resolves an identifier occurrence to its symbol, creating an
    /// unresolved placeholder in the current scope when the name has no
    /// declaration yet (use before declaration, possibly hoisted).
    fn resolve_identifier(&mut self, node: NodeId, flags: SymbolFlags) -> SymbolId {
        let name = self
            .ast
            .identifier_name(node)
            .expect("resolve_identifier needs an identifier node")
            .to_owned();

        let symbol = match self.scopes.resolve_symbol(self.scope, &name) {
            Some(existing) => existing,
            None => {
                let created = self.symbols.create(name.clone(), flags);
                self.symbols.set_unresolved(created, true);
                self.scopes.add_symbol(self.scope, &name, created);
                created
            }
        };

        self.symbols.assign(node, symbol);
        self.symbols.add_reference(symbol, node);
        symbol
    }

    /// Declares an identifier in the current scope, reusing an existing
    /// same-name symbol (upgrading its flags). Hoisted declarations take over
    /// unresolved uses of the name in the scope subtree.
    fn declare_identifier(&mut self, id: NodeId, flags: SymbolFlags) -> SymbolId {
        let name = self
            .ast
            .identifier_name(id)
            .expect("declare_identifier needs an identifier node")
            .to_owned();

        let symbol = match self.scopes.get_own_symbol(self.scope, &name) {
            Some(existing) => {
                self.symbols.set_flags(existing, flags);
                self.symbols.set_unresolved(existing, false);
                existing
            }
            None => {
                let created = self.symbols.create(name.clone(), flags);
                self.scopes.add_symbol(self.scope, &name, created);
                if flags.is_hoisted() {
                    self.resolve_unresolved(created, &name, self.scope);
                }
                created
            }
        };

        self.symbols.assign(id, symbol);
        symbol
    }

    /// Rebinds unresolved same-name symbols in the scope subtree to the newly
    /// hoisted declaration.
    fn resolve_unresolved(&mut self, resolved: SymbolId, name: &str, scope: ScopeId) {
        if let Some(candidate) = self.scopes.get_own_symbol(scope, name) {
            if candidate != resolved && self.symbols.is_unresolved(candidate) {
                for reference in self.symbols.references(candidate) {
                    self.symbols.assign(reference, resolved);
                    self.symbols.add_reference(resolved, reference);
                }
                self.scopes.replace_symbol(scope, name, resolved);
            }
        }

        for child in self.scopes.children(scope).to_vec() {
            self.resolve_unresolved(resolved, name, child);
        }
    }
}

fn anonymous_name(ast: &Ast, node: NodeId, prefix: &str) -> String {
    let span = ast.span(node);
    format!("{prefix}:{}:{}", span.line, span.column)
}

fn number_name(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

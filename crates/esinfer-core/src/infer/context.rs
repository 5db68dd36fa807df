//! The inference context: the current type environment plus access to the
//! program facts and the running analysis.
//!
//! Refinement rules receive a mutable context. The environment itself stays
//! an immutable value — the context swaps in rewritten environments — so a
//! `fresh()` context for a callee can never pollute the caller's state except
//! through the explicit merge channels.

use crate::ast::{NodeId, NodeKind};
use crate::error::TypeError;
use crate::infer::forward::ForwardTypeInferenceAnalysis;
use crate::program::Program;
use crate::semantic::symbol::SymbolId;
use crate::types::{Type, TypeEnvironment};

pub struct InferenceContext<'a> {
    analysis: &'a ForwardTypeInferenceAnalysis<'a>,
    environment: TypeEnvironment,
}

impl<'a> InferenceContext<'a> {
    pub fn new(
        analysis: &'a ForwardTypeInferenceAnalysis<'a>,
        environment: TypeEnvironment,
    ) -> Self {
        Self {
            analysis,
            environment,
        }
    }

    pub fn program(&self) -> &'a Program {
        self.analysis.program()
    }

    pub fn environment(&self) -> &TypeEnvironment {
        &self.environment
    }

    pub fn set_environment(&mut self, environment: TypeEnvironment) {
        self.environment = environment;
    }

    pub fn into_environment(self) -> TypeEnvironment {
        self.environment
    }

    /// Infers the type of `node` with the engine's refinement rules.
    pub fn infer(&mut self, node: NodeId) -> Result<Type, TypeError> {
        let analysis = self.analysis;
        analysis.infer(node, self)
    }

    /// Unifies two types, recording type-variable bindings in the
    /// environment.
    pub fn unify(&mut self, t1: &Type, t2: &Type, node: NodeId) -> Result<Type, TypeError> {
        let analysis = self.analysis;
        analysis.unify(t1, t2, node, self)
    }

    /// Runs the work-list analysis from `node` to the exit and adopts the
    /// exit environment as this context's environment.
    pub fn analyse(&mut self, node: NodeId) -> Result<(), TypeError> {
        let results = self.analysis.analyse_from(node, self.environment.clone())?;
        self.environment = results.get(&None).cloned().unwrap_or_default();
        Ok(())
    }

    pub fn get_type(&self, symbol: SymbolId) -> Option<Type> {
        self.environment.get_type(symbol).cloned()
    }

    pub fn set_type(&mut self, symbol: SymbolId, ty: Type) {
        self.environment = self.environment.set_type(symbol, ty);
    }

    /// Substitutes `old` with `new` throughout the environment.
    pub fn substitute(&mut self, old: &Type, new: &Type) {
        self.environment = self.environment.substitute(old, new);
    }

    /// The symbol assigned to `node` during extraction.
    pub fn symbol_of(&self, node: NodeId) -> Option<SymbolId> {
        self.program().symbol_of(node)
    }

    /// A new context over the same analysis with a copy of the current
    /// environment.
    pub fn fresh(&self) -> InferenceContext<'a> {
        InferenceContext {
            analysis: self.analysis,
            environment: self.environment.clone(),
        }
    }

    /// Takes over the types `other` has for the symbols bound here, except
    /// the excluded ones.
    pub fn replace_types(&mut self, other: &InferenceContext<'_>, excluded: &[SymbolId]) {
        self.environment = self.environment.replace_types(&other.environment, excluded);
    }

    /// Resolves the object side of a member expression to a record-like type
    /// (record, array or string), raising the null-pointer and not-an-object
    /// failures of the access.
    pub fn object_type(&mut self, member: NodeId) -> Result<Type, TypeError> {
        let (object, property) = match self.program().ast().kind(member) {
            NodeKind::MemberExpression {
                object, property, ..
            } => (*object, *property),
            _ => unreachable!("object_type expects a member expression"),
        };

        let object_type = self.infer(object)?;
        if matches!(object_type, Type::Any) {
            return Ok(Type::Any);
        }

        let record = self.to_record_type(&object_type, object)?;
        if matches!(object_type, Type::Void) || matches!(record, Type::Maybe { .. }) {
            let property_name = self
                .symbol_of(property)
                .map(|symbol| self.program().symbols().name(symbol))
                .unwrap_or_else(|| self.program().ast().pretty(property));
            return Err(TypeError::NullPropertyAccess {
                property: property_name,
                object: object_type,
                node: property,
            });
        }

        Ok(record)
    }

    fn to_record_type(&mut self, ty: &Type, node: NodeId) -> Result<Type, TypeError> {
        match ty {
            Type::Record { .. } | Type::Array { .. } | Type::String | Type::Void => Ok(ty.clone()),
            Type::Variable(_) => {
                // An unknown value used as an object becomes an empty record.
                let record = Type::empty_record();
                self.substitute(ty, &record);
                Ok(record)
            }
            Type::Null => Ok(Type::maybe(Type::empty_record())),
            Type::Maybe { of, .. }
                if matches!(**of, Type::Record { .. } | Type::Array { .. } | Type::String) =>
            {
                Ok(ty.clone())
            }
            other => Err(TypeError::NotAnObject {
                ty: other.clone(),
                node,
            }),
        }
    }
}

//! Error taxonomy of the analysis engine.
//!
//! Coverage gaps and ambiguous rule dispatch are programming errors in the
//! rule sets and abort immediately. Type errors describe the analyzed program
//! and carry the offending node so a front-end can render the source
//! location. There is no partial-result mode: the first error anywhere aborts
//! the analysis of the current entry point.

use thiserror::Error;

use crate::ast::NodeId;
use crate::types::Type;

/// Errors raised while extracting symbols and scopes from the AST.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unsupported node type for symbol extraction '{kind}'")]
    UnsupportedNode { kind: &'static str, node: NodeId },

    #[error("unsupported left hand side of assignment '{kind}'")]
    UnsupportedAssignmentTarget { kind: &'static str, node: NodeId },
}

impl ExtractionError {
    pub fn node(&self) -> NodeId {
        match self {
            ExtractionError::UnsupportedNode { node, .. }
            | ExtractionError::UnsupportedAssignmentTarget { node, .. } => *node,
        }
    }
}

/// Errors raised while building the control flow graph.
#[derive(Debug, Error)]
pub enum CfgError {
    #[error("unhandled statement of type {kind}")]
    UnhandledStatement { kind: &'static str, node: NodeId },

    #[error("break statements are not supported inside a try with a finally handler")]
    BreakInFinally { node: NodeId },

    #[error("continue statements are not supported inside a try with a finally handler")]
    ContinueInFinally { node: NodeId },

    #[error("return statements inside of a try statement with a finalizer are not supported")]
    ReturnInFinally { node: NodeId },

    #[error("loop for continue statement not found")]
    MissingContinueTarget { node: NodeId },
}

impl CfgError {
    pub fn node(&self) -> NodeId {
        match self {
            CfgError::UnhandledStatement { node, .. }
            | CfgError::BreakInFinally { node }
            | CfgError::ContinueInFinally { node }
            | CfgError::ReturnInFinally { node }
            | CfgError::MissingContinueTarget { node } => *node,
        }
    }
}

/// Failure to compute the most specific common type of two types.
///
/// Raised by the unificator without node context; the inference engine wraps
/// it into a [`TypeError`] pointing at the node under refinement.
#[derive(Debug, Clone, Error)]
pub enum UnificationError {
    #[error("unification for type '{t1}' and '{t2}' failed because there exists no rule that can be used to unify the given types")]
    NotUnifiable { t1: Type, t2: Type },

    #[error("unification for type '{t1}' and '{t2}' failed because the unification rule to use is ambiguous ({rules})")]
    AmbiguousRule { t1: Type, t2: Type, rules: String },

    #[error("unification for type '{t1}' and '{t2}' failed because the type variable of t1 is contained inside of the type t2 and therefore cannot be replaced by t2")]
    OccursCheck { t1: Type, t2: Type },

    #[error("unification for type '{t1}' and '{t2}' failed because the parametrized types have a different number of type parameters and therefore cannot be unified")]
    ParameterCountMismatch { t1: Type, t2: Type },
}

/// A type inference failure, pointing at the node that triggered it.
#[derive(Debug, Error)]
pub enum TypeError {
    #[error("type inference failure: {source}")]
    Unification {
        #[source]
        source: UnificationError,
        node: NodeId,
    },

    #[error("type inference failure: there exists no refinement rule that can handle a node of type {kind}")]
    NoRefinementRule { kind: &'static str, node: NodeId },

    #[error("type inference failure: the refinement rule to use for a node of type {kind} is ambiguous ({rules})")]
    AmbiguousRefinementRule {
        kind: &'static str,
        rules: String,
        node: NodeId,
    },

    #[error("type inference failure: cannot invoke the non function type {callee}")]
    NotCallable { callee: Type, node: NodeId },

    #[error("type inference failure: the symbol {name} is being used before it's declaration")]
    UsedBeforeDeclaration { name: String, node: NodeId },

    #[error("type inference failure: potential null pointer when accessing property {property} on null or not initialized object of type {object}")]
    NullPropertyAccess {
        property: String,
        object: Type,
        node: NodeId,
    },

    #[error("type inference failure: type {ty} is not a record type and cannot be converted to a record type, cannot be used as object")]
    NotAnObject { ty: Type, node: NodeId },

    #[error("type inference failure: the function cannot be called with this of type '{actual}' whereas '{expected}' is required")]
    IncompatibleThis {
        expected: Type,
        actual: Type,
        node: NodeId,
    },

    #[error("type inference failure: the argument {index} with type '{argument}' is not a subtype of the required parameter type '{parameter}'")]
    ArgumentMismatch {
        index: usize,
        argument: Type,
        parameter: Type,
        node: NodeId,
    },

    #[error("type inference failure: the return type '{actual}' of the callback is not a subtype of the return type '{expected}' of the expected callback")]
    CallbackReturnMismatch {
        expected: Type,
        actual: Type,
        node: NodeId,
    },

    #[error("type inference failure: the {context} operator {operator} is not supported")]
    UnsupportedOperator {
        context: &'static str,
        operator: String,
        node: NodeId,
    },

    #[error("type inference failure: the type {ty} does not support iteration")]
    NotIterable { ty: Type, node: NodeId },

    #[error("type inference failure: the built in property '{property}' of {ty} cannot be reassigned")]
    BuiltinPropertyAssignment {
        property: String,
        ty: Type,
        node: NodeId,
    },

    #[error("type inference failure: access to this outside of a function")]
    ThisOutsideFunction { node: NodeId },
}

impl TypeError {
    /// The AST node that triggered the failure.
    pub fn node(&self) -> NodeId {
        match self {
            TypeError::Unification { node, .. }
            | TypeError::NoRefinementRule { node, .. }
            | TypeError::AmbiguousRefinementRule { node, .. }
            | TypeError::NotCallable { node, .. }
            | TypeError::UsedBeforeDeclaration { node, .. }
            | TypeError::NullPropertyAccess { node, .. }
            | TypeError::NotAnObject { node, .. }
            | TypeError::IncompatibleThis { node, .. }
            | TypeError::ArgumentMismatch { node, .. }
            | TypeError::CallbackReturnMismatch { node, .. }
            | TypeError::UnsupportedOperator { node, .. }
            | TypeError::NotIterable { node, .. }
            | TypeError::BuiltinPropertyAssignment { node, .. }
            | TypeError::ThisOutsideFunction { node } => *node,
        }
    }

    /// True when the failure is a missing unification rule, used by rules
    /// that recover from incompatible element types by widening to `any`.
    pub fn is_not_unifiable(&self) -> bool {
        matches!(
            self,
            TypeError::Unification {
                source: UnificationError::NotUnifiable { .. },
                ..
            }
        )
    }
}

/// Any failure the analysis pipeline can produce.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Cfg(#[from] CfgError),

    #[error(transparent)]
    Type(#[from] TypeError),
}

impl AnalysisError {
    pub fn node(&self) -> NodeId {
        match self {
            AnalysisError::Extraction(e) => e.node(),
            AnalysisError::Cfg(e) => e.node(),
            AnalysisError::Type(e) => e.node(),
        }
    }
}

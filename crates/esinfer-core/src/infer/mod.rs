//! Hindley-Milner type inference as a forward data-flow analysis.
//!
//! - A rule-dispatch refinement engine (one rule per node shape)
//! - A rule-dispatch unificator computing most specific common types
//! - The forward analysis wiring hoisting, the work-list solver and the
//!   engine together

pub mod context;
pub mod engine;
pub mod forward;
pub mod rules;
pub mod unify;

pub use context::InferenceContext;
pub use engine::HindleyMilner;
pub use forward::{ForwardTypeInferenceAnalysis, TypeEnvironments};
pub use unify::TypeUnificator;

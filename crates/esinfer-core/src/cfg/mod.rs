//! Control flow graph construction over statement nodes.
//!
//! - A value-keyed graph model with `True`/`False`/`Unconditional`/
//!   `Exception` edges and idempotent edge insertion
//! - Successor and fall-through computation over the AST
//! - A single-pass builder handling loops, switch fallthrough, labeled
//!   break/continue, try/catch/finally and exception edges

mod builder;
mod graph;
mod successor;

pub use builder::{may_throw, CfgBuilder};
pub use graph::{Branch, CfgNode, CfgValue, ControlFlowGraph, Edge};
pub use successor::{compute_fallthrough, compute_successor};

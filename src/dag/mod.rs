// src/dag/mod.rs

//! Output dependency graph and completion tracking.
//!
//! - [`graph`] builds the DAG between output targets and orders them.
//! - [`signal`] is the per-output completion signal dependents wait on.
//! - [`waiter`] waits for all dependencies of an output.

pub mod graph;
pub mod signal;
pub mod waiter;

pub use graph::{DependencyGraph, DependencyGraphNode};
pub use signal::{CompletionSignal, SignalResult, SignalStatus};
pub use waiter::wait_for_dependencies;

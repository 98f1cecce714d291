// src/exec/mod.rs

//! Output generation layer.
//!
//! - [`backend`] defines the `OutputGenerator` trait the runner talks to, so
//!   tests can swap in a fake generator.
//! - [`command`] is the production generator: it runs the target's `cmd`
//!   through the platform shell and captures its stdout.
//! - [`writer`] writes generated text to disk, skipping unchanged files.

pub mod backend;
pub mod command;
pub mod writer;

pub use backend::{GenerationRequest, OutputGenerator};
pub use command::CommandGenerator;
pub use writer::{OutputWriter, WriteOutcome};

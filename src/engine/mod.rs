// src/engine/mod.rs

//! Orchestration engine for gendag.
//!
//! This module ties together:
//! - the generation runner (one run over the output dependency graph)
//! - the trigger queue (what happens when triggers arrive while a run is active)
//! - the watch session event loop that reacts to:
//!   - rebuild triggers from the file watcher
//!   - config file changes
//!   - run completion
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

/// Identifier of one generation run within a watch session.
pub type RunId = u64;

/// Which outputs a run regenerates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunScope {
    All,
    /// Outputs in first-triggered order, without duplicates.
    Outputs(Vec<String>),
}

impl RunScope {
    pub fn outputs(outputs: impl IntoIterator<Item = String>) -> Self {
        let mut scope = RunScope::Outputs(Vec::new());
        scope.merge(RunScope::Outputs(outputs.into_iter().collect()));
        scope
    }

    /// Union of both scopes.
    pub fn merge(&mut self, other: RunScope) {
        match (&mut *self, other) {
            (RunScope::All, _) => {}
            (this, RunScope::All) => *this = RunScope::All,
            (RunScope::Outputs(current), RunScope::Outputs(new)) => {
                for output in new {
                    if !current.contains(&output) {
                        current.push(output);
                    }
                }
            }
        }
    }

    /// `None` for all outputs, as the runner expects it.
    pub fn selection(&self) -> Option<&[String]> {
        match self {
            RunScope::All => None,
            RunScope::Outputs(outputs) => Some(outputs),
        }
    }
}

/// Events flowing into the watch session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    /// A file change affects these outputs.
    RebuildTriggered { outputs: Vec<String> },
    /// The config file itself changed.
    ConfigChanged,
    /// A run finished (successfully or not).
    RunFinished { run_id: RunId },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod queue;
pub mod runner;
pub mod runtime;

pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use queue::TriggerQueue;
pub use runner::{run_generation, OutputStatus, RunReport, RunRequest};
pub use runtime::Runtime;
pub use crate::types::TriggerWhileRunningBehaviour;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_first_seen_order() {
        let mut scope = RunScope::outputs(vec!["b.ts".to_string(), "a.ts".to_string(), "b.ts".to_string()]);
        assert_eq!(scope, RunScope::Outputs(vec!["b.ts".into(), "a.ts".into()]));

        scope.merge(RunScope::outputs(vec!["c.ts".to_string(), "a.ts".to_string()]));
        assert_eq!(
            scope.selection(),
            Some(&["b.ts".to_string(), "a.ts".to_string(), "c.ts".to_string()][..])
        );

        scope.merge(RunScope::All);
        assert_eq!(scope, RunScope::All);
        assert_eq!(scope.selection(), None);
    }
}

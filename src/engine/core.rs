// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - spawning and aborting generation runs
//! - reloading the config and re-subscribing the watcher
//!
//! The core is intended to be extensively unit tested without any Tokio,
//! channels, filesystem, or processes.

use crate::engine::event_handlers::{
    handle_run_finished, handle_shutdown, handle_trigger, ActiveRun, CoreStep, SessionState,
};
use crate::engine::{RunScope, RuntimeEvent};
use crate::types::TriggerWhileRunningBehaviour;

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    state: SessionState,
}

impl CoreRuntime {
    pub fn new(behaviour: TriggerWhileRunningBehaviour) -> Self {
        Self {
            state: SessionState::new(behaviour),
        }
    }

    /// Whether no run is in flight.
    pub fn is_idle(&self) -> bool {
        self.state.active.is_none()
    }

    pub fn active_run(&self) -> Option<&ActiveRun> {
        self.state.active.as_ref()
    }

    /// Expose queue emptiness (for tests).
    pub fn queue_is_empty(&self) -> bool {
        self.state.queue.is_empty()
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::RebuildTriggered { outputs } => {
                handle_trigger(&mut self.state, RunScope::outputs(outputs), false)
            }
            RuntimeEvent::ConfigChanged => handle_trigger(&mut self.state, RunScope::All, true),
            RuntimeEvent::RunFinished { run_id } => handle_run_finished(&mut self.state, run_id),
            RuntimeEvent::ShutdownRequested => handle_shutdown(&mut self.state),
        }
    }
}

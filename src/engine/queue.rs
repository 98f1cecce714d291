// src/engine/queue.rs

use tracing::debug;

use crate::engine::RunScope;
use crate::types::TriggerWhileRunningBehaviour;

/// Triggers that arrive while a generation run is already executing.
///
/// Semantics:
/// - Everything recorded while a run is active is merged into a *single*
///   pending batch, so any number of triggers leads to at most one follow-up
///   run.
/// - A config change additionally marks the batch as needing a config reload
///   before it starts.
/// - `drain_pending()` hands the batch to the core once the run finishes.
#[derive(Debug)]
pub struct TriggerQueue {
    behaviour: TriggerWhileRunningBehaviour,
    pending: Option<RunScope>,
    reload: bool,
}

/// A drained batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRun {
    pub reload_config: bool,
    pub scope: RunScope,
}

impl TriggerQueue {
    pub fn new(behaviour: TriggerWhileRunningBehaviour) -> Self {
        Self {
            behaviour,
            pending: None,
            reload: false,
        }
    }

    /// Returns true if there are no queued triggers.
    pub fn is_empty(&self) -> bool {
        self.pending.is_none()
    }

    /// Returns the configured behaviour.
    pub fn behaviour(&self) -> TriggerWhileRunningBehaviour {
        self.behaviour
    }

    /// Merge `scope` into the pending batch.
    pub fn record_trigger(&mut self, scope: RunScope) {
        match self.pending.as_mut() {
            Some(pending) => {
                pending.merge(scope);
                debug!(pending = ?pending, "merged trigger into queued batch");
            }
            None => {
                debug!(scope = ?scope, "created queued batch");
                self.pending = Some(scope);
            }
        }
    }

    /// Queue a config reload; the follow-up run regenerates everything.
    pub fn record_reload(&mut self) {
        self.reload = true;
        self.record_trigger(RunScope::All);
    }

    /// Take the pending batch, if any.
    pub fn drain_pending(&mut self) -> Option<PendingRun> {
        let scope = self.pending.take()?;
        let reload_config = std::mem::take(&mut self.reload);
        debug!(?scope, reload_config, "drained queued triggers into new run");
        Some(PendingRun {
            reload_config,
            scope,
        })
    }
}

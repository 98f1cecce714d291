// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, info};

use crate::engine::queue::TriggerQueue;
use crate::engine::{RunId, RunScope};
use crate::types::TriggerWhileRunningBehaviour;

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Start a generation run.
    StartRun { run_id: RunId, scope: RunScope },
    /// Abort a run that is still in progress.
    CancelRun { run_id: RunId },
    /// Reload the config file and re-subscribe the watcher.
    ReloadConfig,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    /// Commands the IO shell should execute, in order.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn continue_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }
}

/// The run currently in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRun {
    pub run_id: RunId,
    pub scope: RunScope,
}

/// Mutable state shared by the handlers.
#[derive(Debug)]
pub struct SessionState {
    pub active: Option<ActiveRun>,
    pub queue: TriggerQueue,
    next_run_id: RunId,
}

impl SessionState {
    pub fn new(behaviour: TriggerWhileRunningBehaviour) -> Self {
        Self {
            active: None,
            queue: TriggerQueue::new(behaviour),
            next_run_id: 1,
        }
    }

    fn start(&mut self, scope: RunScope) -> CoreCommand {
        let run_id = self.next_run_id;
        self.next_run_id += 1;
        self.active = Some(ActiveRun {
            run_id,
            scope: scope.clone(),
        });
        debug!(run_id, ?scope, "starting run");
        CoreCommand::StartRun { run_id, scope }
    }
}

/// Handle a rebuild trigger (or a config change, with `reload_config`).
///
/// - Idle: start a run right away.
/// - Running, `queue`: record the trigger for one follow-up run.
/// - Running, `cancel`: abort the current run and restart with the union of
///   its outputs and the new ones.
pub fn handle_trigger(state: &mut SessionState, scope: RunScope, reload_config: bool) -> CoreStep {
    let mut commands = Vec::new();

    let Some(active) = state.active.clone() else {
        if reload_config {
            commands.push(CoreCommand::ReloadConfig);
        }
        commands.push(state.start(scope));
        return CoreStep::continue_with(commands);
    };

    match state.queue.behaviour() {
        TriggerWhileRunningBehaviour::Queue => {
            if reload_config {
                state.queue.record_reload();
            } else {
                state.queue.record_trigger(scope);
            }
            debug!(run_id = active.run_id, "run in progress; trigger queued");
        }
        TriggerWhileRunningBehaviour::Cancel => {
            info!(run_id = active.run_id, "run in progress; cancelling and restarting");
            let mut merged = active.scope;
            merged.merge(scope);
            commands.push(CoreCommand::CancelRun {
                run_id: active.run_id,
            });
            if reload_config {
                commands.push(CoreCommand::ReloadConfig);
            }
            commands.push(state.start(merged));
        }
    }

    CoreStep::continue_with(commands)
}

/// Handle the end of a run, starting the queued batch if there is one.
///
/// Completions of runs that were already superseded are ignored.
pub fn handle_run_finished(state: &mut SessionState, run_id: RunId) -> CoreStep {
    match &state.active {
        Some(active) if active.run_id == run_id => {}
        _ => {
            debug!(run_id, "ignoring completion of a superseded run");
            return CoreStep::continue_with(Vec::new());
        }
    }
    state.active = None;

    let mut commands = Vec::new();
    if let Some(pending) = state.queue.drain_pending() {
        if pending.reload_config {
            commands.push(CoreCommand::ReloadConfig);
        }
        commands.push(state.start(pending.scope));
    }
    CoreStep::continue_with(commands)
}

/// Handle shutdown: cancel whatever is running and stop the loop.
pub fn handle_shutdown(state: &mut SessionState) -> CoreStep {
    let commands = state
        .active
        .take()
        .map(|active| CoreCommand::CancelRun {
            run_id: active.run_id,
        })
        .into_iter()
        .collect();

    CoreStep {
        commands,
        keep_running: false,
    }
}

// src/engine/runtime.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::DependencyGraph;
use crate::exec::{OutputGenerator, OutputWriter};
use crate::fs::FileSystem;
use crate::types::FsEventKind;
use crate::watch::path_utils::relative_to_cwd;
use crate::watch::{start_watching, WatchHandler, WatchPlan, WatchService, WatchStopper};

use super::core::CoreRuntime;
use super::runner::{run_generation, RunRequest};
use super::{CoreCommand, RunId, RunScope, RuntimeEvent};

/// Session-wide settings that survive config reloads.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub cwd: PathBuf,
    /// Absolute path of the config file.
    pub config_path: PathBuf,
    /// `--concurrency`, applied again after every reload.
    pub concurrency_override: Option<usize>,
}

impl SessionOptions {
    pub fn apply_overrides(&self, config: &mut ConfigFile) {
        if let Some(concurrency) = self.concurrency_override {
            config.config_section_mut().concurrency = concurrency.max(1);
        }
    }
}

/// Forwards watch triggers into the session's event channel.
struct SessionWatchHandler {
    tx: mpsc::UnboundedSender<RuntimeEvent>,
    cwd: PathBuf,
    config_path: PathBuf,
}

impl SessionWatchHandler {
    /// Watchers may report the canonical path (e.g. `/private/var/...` for a
    /// cwd under `/var`), so compare both sides relative to cwd.
    fn is_config_file(&self, path: &Path) -> bool {
        path == self.config_path
            || relative_to_cwd(&self.cwd, path) == relative_to_cwd(&self.cwd, &self.config_path)
    }
}

impl WatchHandler for SessionWatchHandler {
    fn on_trigger(&self, kind: FsEventKind, path: &Path, outputs: &[String]) {
        let event = if self.is_config_file(path) {
            info!(kind = %kind, "config file changed");
            RuntimeEvent::ConfigChanged
        } else {
            info!(kind = %kind, path = %path.display(), ?outputs, "change detected");
            RuntimeEvent::RebuildTriggered {
                outputs: outputs.to_vec(),
            }
        };
        if self.tx.send(event).is_err() {
            debug!("runtime event channel closed; dropping trigger");
        }
    }
}

/// Watch session: keeps outputs up to date while files change.
///
/// This is the IO shell around `CoreRuntime`, which contains all the
/// trigger semantics. This struct owns the watch subscription and the
/// in-flight run, and executes the commands the core returns.
pub struct Runtime {
    core: CoreRuntime,
    event_tx: mpsc::UnboundedSender<RuntimeEvent>,
    event_rx: mpsc::UnboundedReceiver<RuntimeEvent>,
    config: Arc<ConfigFile>,
    options: SessionOptions,
    generator: Arc<dyn OutputGenerator>,
    fs: Arc<dyn FileSystem>,
    watch_service: Arc<dyn WatchService>,
    watcher: Option<WatchStopper>,
    running: Option<(RunId, JoinHandle<()>)>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        config: ConfigFile,
        options: SessionOptions,
        generator: Arc<dyn OutputGenerator>,
        fs: Arc<dyn FileSystem>,
        watch_service: Arc<dyn WatchService>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let behaviour = config.config_section().triggered_while_running_behaviour;
        Self {
            core: CoreRuntime::new(behaviour),
            event_tx,
            event_rx,
            config: Arc::new(config),
            options,
            generator,
            fs,
            watch_service,
            watcher: None,
            running: None,
        }
    }

    /// Sender for injecting events (Ctrl-C handler, tests).
    pub fn event_sender(&self) -> mpsc::UnboundedSender<RuntimeEvent> {
        self.event_tx.clone()
    }

    /// Main event loop.
    ///
    /// - Subscribes the watcher.
    /// - Feeds every `RuntimeEvent` into the core.
    /// - Executes the commands returned by the core.
    ///
    /// Returns after `ShutdownRequested`, with the watcher released and any
    /// in-flight run aborted.
    pub async fn run(mut self) -> Result<()> {
        self.subscribe()?;
        info!("gendag watch session started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");
            let step = self.core.step(event);

            for command in step.commands {
                self.execute_command(command).await;
            }

            if !step.keep_running {
                info!("shutdown requested; stopping watch session");
                break;
            }
        }

        self.abort_running();
        if let Some(watcher) = self.watcher.take() {
            watcher.stop().await?;
        }
        info!("watch session exiting");
        Ok(())
    }

    fn subscribe(&mut self) -> Result<()> {
        let plan = WatchPlan::from_config(&self.config, &self.options.cwd, self.fs.as_ref())?;
        self.subscribe_with(plan)
    }

    fn subscribe_with(&mut self, plan: WatchPlan) -> Result<()> {
        let handler = Arc::new(SessionWatchHandler {
            tx: self.event_tx.clone(),
            cwd: self.options.cwd.clone(),
            config_path: self.options.config_path.clone(),
        });
        self.watcher = Some(start_watching(self.watch_service.as_ref(), plan, handler)?);
        Ok(())
    }

    async fn execute_command(&mut self, command: CoreCommand) {
        match command {
            CoreCommand::StartRun { run_id, scope } => self.start_run(run_id, scope),
            CoreCommand::CancelRun { run_id } => {
                if matches!(&self.running, Some((id, _)) if *id == run_id) {
                    info!(run_id, "cancelling in-flight run");
                    self.abort_running();
                }
            }
            CoreCommand::ReloadConfig => {
                if let Err(err) = self.reload_config().await {
                    error!(error = %format!("{err:#}"), "config reload failed; keeping previous config");
                }
            }
        }
    }

    fn start_run(&mut self, run_id: RunId, scope: RunScope) {
        let request = RunRequest::all(Arc::clone(&self.config), self.options.cwd.clone())
            .with_selection(scope.selection().map(<[String]>::to_vec));
        let generator = Arc::clone(&self.generator);
        let writer = OutputWriter::new(Arc::clone(&self.fs));
        let tx = self.event_tx.clone();

        info!(run_id, ?scope, "starting generation run");
        let handle = tokio::spawn(async move {
            match run_generation(request, generator, writer).await {
                Ok(report) => report.log_summary(),
                Err(err) => error!(run_id, error = %err, "generation run failed"),
            }
            let _ = tx.send(RuntimeEvent::RunFinished { run_id });
        });
        self.running = Some((run_id, handle));
    }

    fn abort_running(&mut self) {
        if let Some((run_id, handle)) = self.running.take() {
            if !handle.is_finished() {
                debug!(run_id, "aborting run");
                handle.abort();
            }
        }
    }

    async fn reload_config(&mut self) -> Result<()> {
        let mut config = load_and_validate(&self.options.config_path)
            .with_context(|| format!("reloading {:?}", self.options.config_path))?;
        self.options.apply_overrides(&mut config);
        DependencyGraph::build(config.generates(), &self.options.cwd)?;
        let plan = WatchPlan::from_config(&config, &self.options.cwd, self.fs.as_ref())?;

        if let Some(watcher) = self.watcher.take() {
            if let Err(err) = watcher.stop().await {
                warn!(error = %err, "failed to release previous watcher");
            }
        }

        if let Err(err) = self.subscribe_with(plan) {
            // Keep watching with the previous config.
            if let Err(restore) = self.subscribe() {
                error!(error = %format!("{restore:#}"), "could not restore previous watcher");
            }
            return Err(err);
        }

        self.config = Arc::new(config);
        info!(outputs = self.config.generates().len(), "config reloaded");
        Ok(())
    }
}

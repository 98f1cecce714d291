// src/watch/event_loop.rs

//! Turn filesystem events into rebuild triggers.
//!
//! [`WatchPlan`] bundles everything derived from the config once (the
//! decider, the watch root and the ignore lists). [`start_watching`]
//! subscribes with it and runs the event loop on a tokio task until the
//! returned [`WatchStopper`] is stopped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::model::{ConfigFile, OutputTarget};
use crate::fs::FileSystem;
use crate::types::FsEventKind;
use crate::watch::path_utils::{relative_path, relative_to_cwd, resolve_against, to_slash};
use crate::watch::patterns::{make_global_pattern_set, make_local_pattern_sets};
use crate::watch::rebuild::{make_should_rebuild, RebuildDecider};
use crate::watch::root::resolve_watch_directory;
use crate::watch::service::{FsEvent, SubscribeOptions, WatchService, WatchSubscription};

/// Always dropped, whatever the config says.
pub const DEFAULT_IGNORE_GLOBS: &[&str] = &["**/.git/**"];

/// Callbacks invoked by the event loop.
pub trait WatchHandler: Send + Sync + 'static {
    /// Every event, before the rebuild decision.
    fn on_event(&self, _event: &FsEvent) {}

    /// An event that affects `outputs` (non-empty, declaration order).
    fn on_trigger(&self, kind: FsEventKind, path: &Path, outputs: &[String]);
}

/// What to watch and how to decide on events.
#[derive(Debug, Clone)]
pub struct WatchPlan {
    pub cwd: PathBuf,
    pub directory: PathBuf,
    pub decider: Arc<RebuildDecider>,
    pub options: SubscribeOptions,
}

impl WatchPlan {
    pub fn from_config(config: &ConfigFile, cwd: &Path, fs: &dyn FileSystem) -> Result<Self> {
        let global = make_global_pattern_set(config, cwd);
        let locals = make_local_pattern_sets(config, cwd);
        let decider = make_should_rebuild(&global, &locals, cwd)?;
        let directory = resolve_watch_directory(&global, &locals, cwd, fs);
        let options = build_subscribe_options(config.generates(), cwd, &directory);

        Ok(Self {
            cwd: cwd.to_path_buf(),
            directory,
            decider: Arc::new(decider),
            options,
        })
    }
}

/// Ignore lists for the subscription.
///
/// Output files are given relative to `cwd`; preset output globs are given
/// relative to the watch `directory`. The two bases differ on purpose.
pub fn build_subscribe_options(
    targets: &[OutputTarget],
    cwd: &Path,
    directory: &Path,
) -> SubscribeOptions {
    let mut options = SubscribeOptions::default();

    for target in targets {
        let absolute = resolve_against(cwd, Path::new(&target.output));
        if target.is_preset() {
            if let Some(extension) = &target.preset_extension {
                let from_watch_dir = to_slash(&relative_path(directory, &absolute));
                let glob = if from_watch_dir.is_empty() {
                    format!("**/*{extension}")
                } else {
                    format!("{}/**/*{extension}", from_watch_dir.trim_end_matches('/'))
                };
                options.ignore_globs.push(glob);
            }
        } else {
            options
                .ignore
                .push(PathBuf::from(relative_to_cwd(cwd, &absolute)));
        }
    }

    options
        .ignore_globs
        .extend(DEFAULT_IGNORE_GLOBS.iter().map(|g| g.to_string()));
    options
}

/// Stops a running event loop and releases its subscription.
pub struct WatchStopper {
    subscription: Option<Box<dyn WatchSubscription>>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    directory: PathBuf,
}

impl std::fmt::Debug for WatchStopper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchStopper")
            .field("directory", &self.directory)
            .finish_non_exhaustive()
    }
}

impl WatchStopper {
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Unsubscribe, then wait for the loop task to exit.
    pub async fn stop(mut self) -> Result<()> {
        let unsubscribed = match self.subscription.take() {
            Some(subscription) => subscription.unsubscribe(),
            None => Ok(()),
        };
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        (&mut self.task)
            .await
            .map_err(|e| anyhow!("watch event loop panicked: {e}"))?;
        info!(dir = %self.directory.display(), "stopped watching");
        unsubscribed
    }
}

/// Subscribe to `plan.directory` and start the event loop.
///
/// Must be called from within a tokio runtime.
pub fn start_watching(
    service: &dyn WatchService,
    plan: WatchPlan,
    handler: Arc<dyn WatchHandler>,
) -> Result<WatchStopper> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<FsEvent>>();
    let subscription = service.subscribe(&plan.directory, &plan.options, tx)?;
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
    let directory = plan.directory.clone();

    info!(dir = %directory.display(), "watching for changes");

    let task = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                batch = rx.recv() => match batch {
                    Some(events) => process_batch(&plan, handler.as_ref(), events),
                    None => break,
                },
            }
        }
        debug!("watch event loop finished");
    });

    Ok(WatchStopper {
        subscription: Some(subscription),
        shutdown: Some(shutdown_tx),
        task,
        directory,
    })
}

fn process_batch(plan: &WatchPlan, handler: &dyn WatchHandler, events: Vec<FsEvent>) {
    for event in events {
        let absolute = if event.path.is_absolute() {
            event.path.clone()
        } else {
            plan.directory.join(&event.path)
        };
        let event = FsEvent {
            path: absolute,
            kind: event.kind,
        };

        handler.on_event(&event);

        match plan.decider.affected_outputs(&event.path) {
            Ok(outputs) if outputs.is_empty() => {
                debug!(path = %event.path.display(), kind = %event.kind, "change does not affect any output");
            }
            Ok(outputs) => {
                debug!(path = %event.path.display(), kind = %event.kind, ?outputs, "change triggers rebuild");
                handler.on_trigger(event.kind, &event.path, &outputs);
            }
            Err(err) => {
                warn!(path = %event.path.display(), error = %err, "could not evaluate change; skipping");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(output: &str) -> OutputTarget {
        OutputTarget::new(output)
    }

    #[test]
    fn static_outputs_are_ignored_relative_to_cwd() {
        let targets = vec![target("src/types.ts"), target("/proj/other/out.ts")];
        let options = build_subscribe_options(&targets, Path::new("/proj"), Path::new("/proj/src"));
        assert_eq!(
            options.ignore,
            vec![PathBuf::from("src/types.ts"), PathBuf::from("other/out.ts")]
        );
    }

    #[test]
    fn preset_globs_are_relative_to_watch_directory() {
        let mut preset = target("src/gql/");
        preset.preset = Some("near-operation-file".to_string());
        preset.preset_extension = Some(".generated.ts".to_string());

        let options = build_subscribe_options(&[preset], Path::new("/proj"), Path::new("/proj/src"));
        assert!(options.ignore.is_empty());
        assert_eq!(options.ignore_globs, vec!["gql/**/*.generated.ts", "**/.git/**"]);
    }

    #[test]
    fn preset_at_watch_root_ignores_everywhere() {
        let mut preset = target(".");
        preset.preset = Some("near-operation-file".to_string());
        preset.preset_extension = Some(".generated.ts".to_string());

        let options = build_subscribe_options(&[preset], Path::new("/proj"), Path::new("/proj"));
        assert_eq!(options.ignore_globs[0], "**/*.generated.ts");
    }

    #[test]
    fn preset_without_extension_adds_nothing() {
        let mut preset = target("src/gql/");
        preset.preset = Some("client".to_string());

        let options = build_subscribe_options(&[preset], Path::new("/proj"), Path::new("/proj"));
        assert!(options.ignore.is_empty());
        assert_eq!(options.ignore_globs, vec!["**/.git/**"]);
    }
}

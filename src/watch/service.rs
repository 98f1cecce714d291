// src/watch/service.rs

//! Filesystem-watch service abstraction and its `notify` implementation.
//!
//! A service delivers batches of [`FsEvent`]s for one directory into an
//! [`EventSink`] until the returned [`WatchSubscription`] is unsubscribed.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::GlobSet;
use notify::event::EventKind;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::types::FsEventKind;
use crate::watch::path_utils::{relative_str, resolve_against};
use crate::watch::patterns::build_globset;

/// One filesystem change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsEvent {
    pub path: PathBuf,
    pub kind: FsEventKind,
}

impl FsEvent {
    pub fn new(kind: FsEventKind, path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Paths and globs the service drops before delivering events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Paths relative to the working directory. A path also ignores
    /// everything below it.
    pub ignore: Vec<PathBuf>,
    /// Globs relative to the watched directory.
    pub ignore_globs: Vec<String>,
}

pub type EventSink = mpsc::UnboundedSender<Vec<FsEvent>>;

pub trait WatchService: Send + Sync {
    fn subscribe(
        &self,
        directory: &Path,
        options: &SubscribeOptions,
        sink: EventSink,
    ) -> Result<Box<dyn WatchSubscription>>;
}

/// A live subscription. Dropping it also stops delivery, `unsubscribe`
/// additionally reports errors from the release.
pub trait WatchSubscription: Send {
    fn unsubscribe(self: Box<Self>) -> Result<()>;
}

/// Compiled form of [`SubscribeOptions`] for one watched directory.
#[derive(Debug, Clone)]
pub struct EventFilter {
    directory: PathBuf,
    ignore: Vec<PathBuf>,
    ignore_globs: GlobSet,
}

impl EventFilter {
    pub fn new(cwd: &Path, directory: &Path, options: &SubscribeOptions) -> Result<Self> {
        Ok(Self {
            directory: directory.to_path_buf(),
            ignore: options
                .ignore
                .iter()
                .map(|p| resolve_against(cwd, p))
                .collect(),
            ignore_globs: build_globset(&options.ignore_globs)?,
        })
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        if self.ignore.iter().any(|ignored| path.starts_with(ignored)) {
            return true;
        }
        match relative_str(&self.directory, path) {
            Some(rel) => self.ignore_globs.is_match(rel),
            None => false,
        }
    }
}

fn map_kind(kind: &EventKind) -> Option<FsEventKind> {
    match kind {
        EventKind::Create(_) => Some(FsEventKind::Create),
        EventKind::Remove(_) => Some(FsEventKind::Delete),
        EventKind::Modify(_) | EventKind::Any | EventKind::Other => Some(FsEventKind::Update),
        EventKind::Access(_) => None,
    }
}

/// Converts one notify event into a batch, dropping ignored paths.
fn to_batch(event: Event, filter: &EventFilter) -> Vec<FsEvent> {
    let Some(kind) = map_kind(&event.kind) else {
        return Vec::new();
    };
    event
        .paths
        .into_iter()
        .filter(|p| !filter.is_ignored(p))
        .map(|path| FsEvent { path, kind })
        .collect()
}

/// Watch service backed by `notify`'s recommended platform watcher.
#[derive(Debug, Clone)]
pub struct NotifyWatchService {
    cwd: PathBuf,
}

impl NotifyWatchService {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }
}

struct NotifySubscription {
    watcher: RecommendedWatcher,
    directory: PathBuf,
}

impl WatchSubscription for NotifySubscription {
    fn unsubscribe(mut self: Box<Self>) -> Result<()> {
        self.watcher
            .unwatch(&self.directory)
            .with_context(|| format!("unwatching {:?}", self.directory))?;
        debug!(dir = %self.directory.display(), "file watcher released");
        Ok(())
    }
}

impl WatchService for NotifyWatchService {
    fn subscribe(
        &self,
        directory: &Path,
        options: &SubscribeOptions,
        sink: EventSink,
    ) -> Result<Box<dyn WatchSubscription>> {
        let filter = EventFilter::new(&self.cwd, directory, options)?;

        // Runs on notify's own thread.
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let batch = to_batch(event, &filter);
                    if batch.is_empty() {
                        return;
                    }
                    if sink.send(batch).is_err() {
                        debug!("watch event receiver dropped; discarding batch");
                    }
                }
                Err(err) => warn!(error = %err, "file watch error"),
            },
            Config::default(),
        )
        .context("creating file watcher")?;

        watcher
            .watch(directory, RecursiveMode::Recursive)
            .with_context(|| format!("watching {:?}", directory))?;

        info!(
            dir = %directory.display(),
            ignore = options.ignore.len(),
            ignore_globs = options.ignore_globs.len(),
            "file watcher started"
        );

        Ok(Box::new(NotifySubscription {
            watcher,
            directory: directory.to_path_buf(),
        }))
    }
}

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use gendag::types::FsEventKind;
use gendag::watch::{EventSink, FsEvent, SubscribeOptions, WatchService, WatchSubscription};

#[derive(Debug, Default)]
struct State {
    subscriptions: Vec<(PathBuf, SubscribeOptions)>,
    sink: Option<EventSink>,
    unsubscribed: usize,
}

/// A fake watch service that:
/// - records every subscription (directory + ignore options)
/// - lets tests push event batches into the active subscription
/// - counts unsubscriptions.
#[derive(Debug, Clone, Default)]
pub struct FakeWatchService {
    state: Arc<Mutex<State>>,
}

impl FakeWatchService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriptions(&self) -> Vec<(PathBuf, SubscribeOptions)> {
        self.state.lock().unwrap().subscriptions.clone()
    }

    pub fn last_subscription(&self) -> Option<(PathBuf, SubscribeOptions)> {
        self.state.lock().unwrap().subscriptions.last().cloned()
    }

    pub fn unsubscribe_count(&self) -> usize {
        self.state.lock().unwrap().unsubscribed
    }

    pub fn is_subscribed(&self) -> bool {
        self.state.lock().unwrap().sink.is_some()
    }

    /// Deliver a batch to the active subscription. Returns false when there
    /// is none.
    pub fn dispatch(&self, events: Vec<FsEvent>) -> bool {
        match &self.state.lock().unwrap().sink {
            Some(sink) => sink.send(events).is_ok(),
            None => false,
        }
    }

    pub fn emit(&self, kind: FsEventKind, path: impl AsRef<Path>) -> bool {
        self.dispatch(vec![FsEvent::new(kind, path.as_ref())])
    }
}

struct FakeSubscription {
    state: Arc<Mutex<State>>,
}

impl WatchSubscription for FakeSubscription {
    fn unsubscribe(self: Box<Self>) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.sink = None;
        state.unsubscribed += 1;
        Ok(())
    }
}

impl WatchService for FakeWatchService {
    fn subscribe(
        &self,
        directory: &Path,
        options: &SubscribeOptions,
        sink: EventSink,
    ) -> anyhow::Result<Box<dyn WatchSubscription>> {
        let mut state = self.state.lock().unwrap();
        state
            .subscriptions
            .push((directory.to_path_buf(), options.clone()));
        state.sink = Some(sink);
        Ok(Box::new(FakeSubscription {
            state: Arc::clone(&self.state),
        }))
    }
}

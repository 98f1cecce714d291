// src/dag/signal.rs

//! Lazily materialized completion signal for one output target.
//!
//! Most targets have no dependents, so nobody ever waits on them. The signal
//! therefore only records outcomes until someone asks for [`running`]; the
//! channel backing the returned futures is created on that first request.
//!
//! State machine:
//!
//! ```text
//! UnconsumedPending -> UnconsumedSucceeded | UnconsumedFailed
//! UnconsumedPending -> ConsumedPending -> Succeeded | Failed
//! ```
//!
//! [`running`]: CompletionSignal::running

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::anyhow;
use futures::future::{BoxFuture, FutureExt};
use tokio::sync::watch;

/// Outcome observed by waiters. The error is shared between all of them.
pub type SignalResult = std::result::Result<(), Arc<anyhow::Error>>;

/// Externally visible state of a [`CompletionSignal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalStatus {
    UnconsumedPending,
    UnconsumedSucceeded,
    UnconsumedFailed,
    ConsumedPending,
    Succeeded,
    Failed,
}

impl SignalStatus {
    pub fn is_settled(self) -> bool {
        !matches!(
            self,
            SignalStatus::UnconsumedPending | SignalStatus::ConsumedPending
        )
    }
}

#[derive(Debug)]
enum SignalState {
    /// Nobody asked for a future yet; outcomes are only recorded.
    Unconsumed {
        succeeded: bool,
        error: Option<Arc<anyhow::Error>>,
    },
    /// A future was handed out; `None` until settled.
    Consumed(watch::Sender<Option<SignalResult>>),
}

#[derive(Debug)]
pub struct CompletionSignal {
    state: Mutex<SignalState>,
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionSignal {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SignalState::Unconsumed {
                succeeded: false,
                error: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SignalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn success(&self) {
        match &mut *self.lock() {
            SignalState::Unconsumed { succeeded, .. } => *succeeded = true,
            SignalState::Consumed(tx) => settle(tx, Ok(())),
        }
    }

    pub fn fail(&self, error: anyhow::Error) {
        match &mut *self.lock() {
            SignalState::Unconsumed { error: recorded, .. } => {
                if recorded.is_none() {
                    *recorded = Some(Arc::new(error));
                }
            }
            SignalState::Consumed(tx) => settle(tx, Err(Arc::new(error))),
        }
    }

    /// Future resolving once the signal settles.
    ///
    /// The first call materializes the signal: a recorded failure wins over
    /// a recorded success. Later calls observe the same outcome.
    pub fn running(&self) -> BoxFuture<'static, SignalResult> {
        let mut rx = {
            let mut state = self.lock();
            match &*state {
                SignalState::Consumed(tx) => tx.subscribe(),
                SignalState::Unconsumed { succeeded, error } => {
                    let initial = match (error, succeeded) {
                        (Some(error), _) => Some(Err(Arc::clone(error))),
                        (None, true) => Some(Ok(())),
                        (None, false) => None,
                    };
                    let (tx, rx) = watch::channel(initial);
                    *state = SignalState::Consumed(tx);
                    rx
                }
            }
        };

        async move {
            let settled = match rx.wait_for(Option::is_some).await {
                Ok(value) => value.clone(),
                Err(_) => None,
            };
            settled.unwrap_or_else(|| {
                Err(Arc::new(anyhow!(
                    "completion signal dropped before it settled"
                )))
            })
        }
        .boxed()
    }

    pub fn status(&self) -> SignalStatus {
        match &*self.lock() {
            SignalState::Unconsumed { error: Some(_), .. } => SignalStatus::UnconsumedFailed,
            SignalState::Unconsumed {
                succeeded: true, ..
            } => SignalStatus::UnconsumedSucceeded,
            SignalState::Unconsumed { .. } => SignalStatus::UnconsumedPending,
            SignalState::Consumed(tx) => match &*tx.borrow() {
                None => SignalStatus::ConsumedPending,
                Some(Ok(())) => SignalStatus::Succeeded,
                Some(Err(_)) => SignalStatus::Failed,
            },
        }
    }
}

/// First settlement wins.
fn settle(tx: &watch::Sender<Option<SignalResult>>, result: SignalResult) {
    tx.send_if_modified(|current| {
        if current.is_some() {
            return false;
        }
        *current = Some(result);
        true
    });
}

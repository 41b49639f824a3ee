//! Observable holder of the client [`AppState`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use super::state::{reduce, Action, AppState};

/// Cloneable handle to one client's state. Every clone sees the same value.
#[derive(Clone)]
pub struct Store {
    tx: Arc<watch::Sender<AppState>>,
}

impl Store {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(AppState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Runs the reducer. Observers are woken only when the state changed.
    pub fn dispatch(&self, action: Action) {
        self.tx.send_if_modified(|state| reduce(state, action));
    }

    pub fn snapshot(&self) -> AppState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }

    /// Resolves once the session generation moves past `generation`.
    pub async fn generation_ended(&self, generation: u64) {
        let mut states = self.subscribe();
        loop {
            if states.borrow_and_update().session_generation != generation {
                return;
            }
            if states.changed().await.is_err() {
                // The sender lives in `self`, so this is unreachable in practice.
                std::future::pending::<()>().await;
            }
        }
    }

    /// Waits up to `timeout` for `pred` to hold. Returns whether it did.
    pub async fn wait_until<F>(&self, timeout: Duration, pred: F) -> bool
    where
        F: Fn(&AppState) -> bool,
    {
        let mut states = self.subscribe();
        let waited = tokio::time::timeout(timeout, async {
            loop {
                if pred(&states.borrow_and_update()) {
                    return true;
                }
                if states.changed().await.is_err() {
                    return false;
                }
            }
        })
        .await;
        waited.unwrap_or(false)
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

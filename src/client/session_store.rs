//! Session Store: mirrors the auth service's view of who is signed in.
//!
//! There is no mutation API here. Sign-in and sign-out go through the auth
//! service; this store only observes the resulting events and dispatches
//! them into the client state.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::state::Action;
use super::store::Store;
use crate::backend::AuthService;

pub struct SessionStore {
    task: JoinHandle<()>,
}

impl SessionStore {
    /// Subscribes to session changes, then loads the existing session.
    ///
    /// Subscribing first means a sign-in that lands between the two steps
    /// is still observed.
    pub async fn mount(auth: Arc<dyn AuthService>, store: Store) -> Self {
        let mut events = auth.subscribe();

        match auth.current_session().await {
            Ok(session) => store.dispatch(Action::SessionChanged(session)),
            Err(e) => warn!(error = %e, "failed to load current session"),
        }

        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        debug!(?event, "auth event");
                        store.dispatch(Action::SessionChanged(event.session().cloned()));
                    }
                    Err(RecvError::Lagged(missed)) => {
                        warn!(missed, "auth events lagged; reloading session");
                        match auth.current_session().await {
                            Ok(session) => store.dispatch(Action::SessionChanged(session)),
                            Err(e) => warn!(error = %e, "failed to reload session"),
                        }
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Self { task }
    }

    /// Stops observing session changes.
    pub fn teardown(&self) {
        self.task.abort();
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.task.abort();
    }
}

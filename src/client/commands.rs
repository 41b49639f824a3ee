//! Command Handlers: user-triggered operations.
//!
//! Commands are best-effort. A backend failure is logged and swallowed; the
//! View never sees an error and cannot tell a failed command from a pending
//! one. Callers that need to know (the RPC layer, tests) read the returned
//! [`CommandOutcome`].
//!
//! Every backend call runs scoped to the session generation it started
//! under. If the user signs out or switches identity first, the call is
//! dropped and the command reports [`CommandOutcome::Cancelled`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use super::state::Action;
use super::store::Store;
use super::sync::refresh;
use crate::backend::{AuthService, BookmarkStore};
use crate::types::bookmark::NewBookmark;
use crate::types::session::{OAuthCallback, OAuthRedirect, Session};

/// How long auth commands wait for the Session Store to observe their effect.
const SESSION_SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandOutcome {
    /// The backend accepted the operation.
    Applied,
    /// Guard failed (missing input or no session); nothing was sent.
    Skipped,
    /// The backend rejected the operation or was unreachable.
    Failed,
    /// The session ended before the backend answered.
    Cancelled,
}

#[derive(Clone)]
pub struct Commands {
    store: Store,
    auth: Arc<dyn AuthService>,
    bookmarks: Arc<dyn BookmarkStore>,
}

impl Commands {
    pub fn new(store: Store, auth: Arc<dyn AuthService>, bookmarks: Arc<dyn BookmarkStore>) -> Self {
        Self {
            store,
            auth,
            bookmarks,
        }
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.store.dispatch(Action::SetTitle(title.into()));
    }

    pub fn set_url(&self, url: impl Into<String>) {
        self.store.dispatch(Action::SetUrl(url.into()));
    }

    /// Adds a bookmark from the current input fields.
    pub async fn submit(&self) -> CommandOutcome {
        let state = self.store.snapshot();
        self.add(&state.title_input, &state.url_input).await
    }

    /// Adds a bookmark owned by the current user, clears the inputs, then
    /// refreshes the cache.
    ///
    /// No-op if `title` or `url` is empty or nobody is signed in. The new
    /// bookmark shows up only once the refresh lands.
    pub async fn add(&self, title: &str, url: &str) -> CommandOutcome {
        let Some((session, generation)) = self.current() else {
            return CommandOutcome::Skipped;
        };
        if title.is_empty() || url.is_empty() {
            return CommandOutcome::Skipped;
        }

        let new = NewBookmark {
            title: title.to_string(),
            url: url.to_string(),
            user_id: session.user_id.clone(),
        };
        let outcome = match self.scoped(generation, self.bookmarks.insert(new)).await {
            None => return CommandOutcome::Cancelled,
            Some(Ok(_)) => CommandOutcome::Applied,
            Some(Err(e)) => {
                warn!(error = %e, "add bookmark failed");
                CommandOutcome::Failed
            }
        };

        self.store.dispatch(Action::ClearInputs);
        self.refresh_scoped(&session, generation).await;
        outcome
    }

    /// Deletes one of the current user's bookmarks, then refreshes.
    ///
    /// The backend only deletes rows owned by the caller; any other id is a
    /// silent failure.
    pub async fn delete(&self, id: &str) -> CommandOutcome {
        let Some((session, generation)) = self.current() else {
            return CommandOutcome::Skipped;
        };

        let outcome = match self
            .scoped(generation, self.bookmarks.delete(id, &session.user_id))
            .await
        {
            None => return CommandOutcome::Cancelled,
            Some(Ok(())) => CommandOutcome::Applied,
            Some(Err(e)) => {
                warn!(error = %e, id, "delete bookmark failed");
                CommandOutcome::Failed
            }
        };

        self.refresh_scoped(&session, generation).await;
        outcome
    }

    /// Starts the OAuth flow. The caller sends the user to the returned URL;
    /// the session arrives later through [`Commands::complete_sign_in`].
    pub async fn sign_in(&self, provider: &str) -> Option<OAuthRedirect> {
        match self.auth.sign_in_with_oauth(provider).await {
            Ok(redirect) => Some(redirect),
            Err(e) => {
                warn!(error = %e, provider, "sign-in could not start");
                None
            }
        }
    }

    /// Handles the provider redirect and waits for the Session Store to
    /// pick up the new session.
    pub async fn complete_sign_in(&self, callback: OAuthCallback) -> CommandOutcome {
        match self.auth.handle_redirect(callback).await {
            Ok(session) => {
                self.store
                    .wait_until(SESSION_SETTLE_TIMEOUT, |s| {
                        s.session.as_ref().map(|x| &x.user_id) == Some(&session.user_id)
                    })
                    .await;
                CommandOutcome::Applied
            }
            Err(e) => {
                warn!(error = %e, "sign-in callback rejected");
                CommandOutcome::Failed
            }
        }
    }

    /// Rotates the access token. The cache and generation are kept.
    pub async fn refresh_token(&self) -> CommandOutcome {
        match self.auth.refresh_session().await {
            Ok(_) => CommandOutcome::Applied,
            Err(e) => {
                warn!(error = %e, "token refresh failed");
                CommandOutcome::Failed
            }
        }
    }

    /// Revokes whatever session the auth service holds, even one the store
    /// never saw (e.g. when loading it at mount failed).
    pub async fn sign_out(&self) -> CommandOutcome {
        let result = self.auth.sign_out().await;
        if self.store.snapshot().session.is_some() {
            self.store
                .wait_until(SESSION_SETTLE_TIMEOUT, |s| s.session.is_none())
                .await;
        }
        match result {
            Ok(()) => {
                info!("sign-out complete");
                CommandOutcome::Applied
            }
            Err(e) => {
                warn!(error = %e, "sign-out failed");
                CommandOutcome::Failed
            }
        }
    }

    fn current(&self) -> Option<(Session, u64)> {
        let state = self.store.snapshot();
        state.session.map(|s| (s, state.session_generation))
    }

    /// Runs `fut` unless the session generation ends first.
    async fn scoped<F: Future>(&self, generation: u64, fut: F) -> Option<F::Output> {
        tokio::select! {
            out = fut => Some(out),
            _ = self.store.generation_ended(generation) => None,
        }
    }

    async fn refresh_scoped(&self, session: &Session, generation: u64) {
        let fetched = self
            .scoped(generation, refresh(&self.store, self.bookmarks.as_ref(), session, generation))
            .await;
        if let Some(Err(e)) = fetched {
            warn!(error = %e, "bookmark refresh failed");
        }
    }
}

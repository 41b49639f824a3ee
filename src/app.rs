//! App Core for SmartMark.
//!
//! One [`App`] is one open client instance: a store, the two long-lived
//! subscriptions (session changes, bookmark changes) and the command
//! handlers, all bound to the same backend services.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::{AuthService, Backend, BookmarkStore, ChangeFeed, LocalAuth};
use crate::client::session_store::SessionStore;
use crate::client::sync::SyncController;
use crate::client::{render, AppState, Commands, Screen, Store, TokenFile, TokenPersistence};

/// The backend contracts a client instance consumes.
#[derive(Clone)]
pub struct Services {
    pub auth: Arc<dyn AuthService>,
    pub bookmarks: Arc<dyn BookmarkStore>,
    pub feed: Arc<dyn ChangeFeed>,
}

impl Services {
    /// Services for a fresh client of the local backend.
    pub fn local(backend: Arc<Backend>) -> Self {
        Self::with_auth(backend.clone(), Arc::new(LocalAuth::new(backend)))
    }

    /// Services for the local backend with a specific auth handle, e.g. one
    /// restored with [`LocalAuth::resume`].
    pub fn with_auth(backend: Arc<Backend>, auth: Arc<dyn AuthService>) -> Self {
        Self {
            auth,
            bookmarks: backend.clone(),
            feed: backend,
        }
    }
}

pub struct App {
    store: Store,
    commands: Commands,
    session_store: SessionStore,
    sync: SyncController,
    persistence: Option<TokenPersistence>,
}

impl App {
    /// Mounts a client: loads the existing session and starts both
    /// subscriptions.
    pub async fn mount(services: Services) -> Self {
        let store = Store::new();
        let sync = SyncController::mount(store.clone(), services.bookmarks.clone(), services.feed.clone());
        let session_store = SessionStore::mount(services.auth.clone(), store.clone()).await;
        let commands = Commands::new(store.clone(), services.auth, services.bookmarks);

        debug!("client mounted");
        Self {
            store,
            commands,
            session_store,
            sync,
            persistence: None,
        }
    }

    /// Mounts a client of the local backend whose access token is kept in
    /// `token_file`, resuming the saved session if the backend still
    /// accepts it.
    pub async fn mount_persistent(backend: Arc<Backend>, token_file: TokenFile) -> Self {
        let saved = match token_file.load() {
            Ok(saved) => saved,
            Err(e) => {
                warn!(error = %e, path = %token_file.path().display(), "ignoring saved token");
                None
            }
        };
        let resumed = saved.is_some();
        let auth = Arc::new(match saved {
            Some(token) => LocalAuth::resume(backend.clone(), token.as_str().to_owned()),
            None => LocalAuth::new(backend.clone()),
        });

        let persistence = TokenPersistence::start(auth.clone(), token_file);
        let mut app = Self::mount(Services::with_auth(backend, auth.clone())).await;
        app.persistence = Some(persistence);

        if resumed {
            match app.state().session {
                Some(session) => info!(user_id = %session.user_id, "session resumed"),
                None => {
                    // Expired or revoked while the client was closed; signing
                    // out drops the token and clears the file.
                    if let Err(e) = auth.sign_out().await {
                        warn!(error = %e, "failed to drop stale token");
                    }
                }
            }
        }
        app
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn commands(&self) -> &Commands {
        &self.commands
    }

    pub fn state(&self) -> AppState {
        self.store.snapshot()
    }

    pub fn render(&self) -> Screen {
        render(&self.store.snapshot())
    }

    /// Releases the subscriptions. Dropping the `App` does the same.
    pub fn teardown(self) {
        if let Some(persistence) = &self.persistence {
            persistence.teardown();
        }
        self.sync.teardown();
        self.session_store.teardown();
        debug!("client torn down");
    }
}

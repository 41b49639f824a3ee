//! In-process backend for SmartMark.
//!
//! The client only talks to the three service traits defined here
//! ([`AuthService`], [`BookmarkStore`], [`ChangeFeed`]). [`Backend`] is the
//! local implementation: one SQLite database, one change broadcast, shared by
//! every client instance through an `Arc`.

pub mod auth;
pub mod bookmark_store;
pub mod change_feed;

use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::Connection;
use tokio::sync::broadcast;
use tracing::debug;

use crate::config::{AppConfig, OAuthConfig};
use crate::database::Database;
use crate::services::token_service::TokenService;
use crate::types::change::ChangeEvent;

pub use auth::{AuthService, LocalAuth};
pub use bookmark_store::BookmarkStore;
pub use change_feed::{ChangeFeed, ChangeSubscription, Notification};

/// Buffered change events per subscriber before it is considered lagged.
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Shared local backend: persistence, auth bookkeeping and change fan-out.
pub struct Backend {
    db: Mutex<Database>,
    changes: broadcast::Sender<ChangeEvent>,
    tokens: TokenService,
    session_ttl_ms: i64,
    oauth: OAuthConfig,
}

impl Backend {
    pub fn new(db: Database, config: &AppConfig) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            db: Mutex::new(db),
            changes,
            tokens: TokenService::new(),
            session_ttl_ms: config.session_ttl_secs.saturating_mul(1000),
            oauth: config.oauth.clone(),
        }
    }

    /// Opens the database named by `config` and wraps it in a backend.
    pub fn open(config: &AppConfig) -> Result<Self, rusqlite::Error> {
        Ok(Self::new(Database::open(config.database_path())?, config))
    }

    pub fn in_memory(config: &AppConfig) -> Result<Self, rusqlite::Error> {
        Ok(Self::new(Database::open_in_memory()?, config))
    }

    /// Number of change-feed subscriptions currently open.
    pub fn active_channels(&self) -> usize {
        self.changes.receiver_count()
    }

    pub(crate) fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    pub(crate) fn oauth(&self) -> &OAuthConfig {
        &self.oauth
    }

    pub(crate) fn session_ttl_ms(&self) -> i64 {
        self.session_ttl_ms
    }

    /// Runs `f` with exclusive access to the connection.
    ///
    /// The lock is never held across an `.await`.
    pub(crate) fn with_conn<T, E>(&self, f: impl FnOnce(&Connection) -> Result<T, E>) -> Result<T, E> {
        let guard: MutexGuard<'_, Database> = self.db.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(guard.connection())
    }

    pub(crate) fn publish(&self, event: ChangeEvent) {
        match self.changes.send(event) {
            Ok(receivers) => debug!(receivers, "change event published"),
            Err(_) => debug!("change event dropped: no subscribers"),
        }
    }

    pub(crate) fn change_receiver(&self) -> broadcast::Receiver<ChangeEvent> {
        self.changes.subscribe()
    }
}

/// Current UNIX time in milliseconds.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

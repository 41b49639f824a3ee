//! Authentication.
//!
//! [`LocalAuth`] is one client instance's handle on the backend's auth
//! tables. It holds the raw access token (zeroized on drop), tracks pending
//! OAuth `state` values, and broadcasts [`AuthEvent`]s to whoever observes
//! the session.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use super::{now_millis, Backend};
use crate::services::token_service::TokenServiceTrait;
use crate::types::errors::AuthError;
use crate::types::session::{AuthEvent, OAuthCallback, OAuthRedirect, Session};

const AUTH_EVENT_CAPACITY: usize = 16;

/// Identity operations the client consumes.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// The session this client holds, if it is still valid on the backend.
    async fn current_session(&self) -> Result<Option<Session>, AuthError>;

    /// Session-change notifications for this client.
    fn subscribe(&self) -> broadcast::Receiver<AuthEvent>;

    /// Starts an OAuth sign-in and returns where to send the user.
    async fn sign_in_with_oauth(&self, provider: &str) -> Result<OAuthRedirect, AuthError>;

    /// Completes a sign-in when the provider redirects back.
    async fn handle_redirect(&self, callback: OAuthCallback) -> Result<Session, AuthError>;

    /// Rotates the access token and extends the session.
    async fn refresh_session(&self) -> Result<Session, AuthError>;

    /// Revokes the session on the backend.
    async fn sign_out(&self) -> Result<(), AuthError>;
}

// ─── Backend auth bookkeeping ───

impl Backend {
    fn authorize_url(&self, provider: &str, state: &str) -> Result<String, AuthError> {
        let config = self
            .oauth()
            .providers
            .get(provider)
            .ok_or_else(|| AuthError::UnknownProvider(provider.to_string()))?;

        Ok(format!(
            "{}?response_type=code&client_id={}&redirect_uri={}&scope={}&state={}",
            config.authorize_url,
            urlencoding::encode(&config.client_id),
            urlencoding::encode(&self.oauth().redirect_url),
            urlencoding::encode(&config.scope),
            urlencoding::encode(state),
        ))
    }

    /// Finds or creates the user for a provider identity, refreshing the email.
    fn upsert_user(&self, provider: &str, subject: &str, email: &str) -> Result<String, AuthError> {
        self.with_conn(|conn| {
            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM users WHERE provider = ?1 AND subject = ?2",
                    params![provider, subject],
                    |row| row.get(0),
                )
                .optional()?;

            match existing {
                Some(id) => {
                    conn.execute("UPDATE users SET email = ?1 WHERE id = ?2", params![email, id])?;
                    Ok(id)
                }
                None => {
                    let id = Uuid::new_v4().to_string();
                    conn.execute(
                        "INSERT INTO users (id, provider, subject, email, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                        params![id, provider, subject, email, now_millis()],
                    )?;
                    Ok(id)
                }
            }
        })
    }

    fn create_session(&self, user_id: &str) -> Result<Zeroizing<String>, AuthError> {
        let token = self.tokens().generate_access_token()?;
        let hash = self.tokens().hash_token(&token);
        let now = now_millis();

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO auth_sessions (id, user_id, token_hash, created_at, expires_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![Uuid::new_v4().to_string(), user_id, hash, now, now.saturating_add(self.session_ttl_ms())],
            )
            .map_err(AuthError::from)
        })?;
        Ok(token)
    }

    /// Resolves a token to its session, ignoring revoked and expired ones.
    fn session_for_token(&self, token: &str) -> Result<Option<Session>, AuthError> {
        let hash = self.tokens().hash_token(token);
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT u.id, u.email FROM auth_sessions s JOIN users u ON u.id = s.user_id \
                 WHERE s.token_hash = ?1 AND s.expires_at > ?2",
                params![hash, now_millis()],
                |row| {
                    Ok(Session {
                        user_id: row.get(0)?,
                        email: row.get(1)?,
                    })
                },
            )
            .optional()
            .map_err(AuthError::from)
        })
    }

    fn rotate_session(&self, token: &str) -> Result<Zeroizing<String>, AuthError> {
        let old_hash = self.tokens().hash_token(token);
        let fresh = self.tokens().generate_access_token()?;
        let new_hash = self.tokens().hash_token(&fresh);
        let now = now_millis();

        let affected = self.with_conn(|conn| {
            conn.execute(
                "UPDATE auth_sessions SET token_hash = ?1, expires_at = ?2 \
                 WHERE token_hash = ?3 AND expires_at > ?4",
                params![new_hash, now.saturating_add(self.session_ttl_ms()), old_hash, now],
            )
            .map_err(AuthError::from)
        })?;

        if affected == 0 {
            return Err(AuthError::SessionExpired);
        }
        Ok(fresh)
    }

    fn revoke_session(&self, token: &str) -> Result<(), AuthError> {
        let hash = self.tokens().hash_token(token);
        self.with_conn(|conn| {
            conn.execute("DELETE FROM auth_sessions WHERE token_hash = ?1", params![hash])
                .map_err(AuthError::from)
        })?;
        Ok(())
    }
}

// ─── LocalAuth ───

/// Per-client auth handle backed by the shared [`Backend`].
pub struct LocalAuth {
    backend: Arc<Backend>,
    events: broadcast::Sender<AuthEvent>,
    token: Mutex<Option<Zeroizing<String>>>,
    /// OAuth `state` -> provider name, for sign-ins awaiting their redirect.
    pending: Mutex<HashMap<String, String>>,
}

impl LocalAuth {
    pub fn new(backend: Arc<Backend>) -> Self {
        let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
        Self {
            backend,
            events,
            token: Mutex::new(None),
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// Restores a client that already holds an access token.
    pub fn resume(backend: Arc<Backend>, token: String) -> Self {
        let auth = Self::new(backend);
        *auth.lock_token() = Some(Zeroizing::new(token));
        auth
    }

    /// The raw access token, for persisting across restarts.
    pub fn access_token(&self) -> Option<Zeroizing<String>> {
        self.lock_token().clone()
    }

    fn lock_token(&self) -> std::sync::MutexGuard<'_, Option<Zeroizing<String>>> {
        self.token.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: AuthEvent) {
        // No observers is not an error: nothing is mounted yet.
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl AuthService for LocalAuth {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        let token = self.lock_token().clone();
        match token {
            Some(token) => self.backend.session_for_token(&token),
            None => Ok(None),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    async fn sign_in_with_oauth(&self, provider: &str) -> Result<OAuthRedirect, AuthError> {
        let state = self.backend.tokens().generate_state()?;
        let url = self.backend.authorize_url(provider, &state)?;
        self.lock_pending().insert(state.clone(), provider.to_string());

        debug!(provider, "oauth sign-in started");
        Ok(OAuthRedirect {
            provider: provider.to_string(),
            url,
            state,
        })
    }

    async fn handle_redirect(&self, callback: OAuthCallback) -> Result<Session, AuthError> {
        let provider = self
            .lock_pending()
            .remove(&callback.state)
            .ok_or(AuthError::InvalidState)?;

        let user_id = self
            .backend
            .upsert_user(&provider, &callback.subject, &callback.email)?;
        let token = self.backend.create_session(&user_id)?;
        let previous = self.lock_token().replace(token);

        // Signing in again replaces the session; the old one must not outlive it.
        if let Some(previous) = previous {
            match self.backend.revoke_session(&previous) {
                Ok(()) => debug!("previous session revoked"),
                Err(e) => warn!(error = %e, "failed to revoke previous session"),
            }
        }

        let session = Session {
            user_id,
            email: callback.email,
        };
        info!(user_id = %session.user_id, provider = %provider, "signed in");
        self.emit(AuthEvent::SignedIn(session.clone()));
        Ok(session)
    }

    async fn refresh_session(&self) -> Result<Session, AuthError> {
        let token = self.lock_token().clone().ok_or(AuthError::NotSignedIn)?;
        let fresh = self.backend.rotate_session(&token)?;
        let session = self
            .backend
            .session_for_token(&fresh)?
            .ok_or(AuthError::SessionExpired)?;
        *self.lock_token() = Some(fresh);

        debug!(user_id = %session.user_id, "session refreshed");
        self.emit(AuthEvent::TokenRefreshed(session.clone()));
        Ok(session)
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        let token = self.lock_token().take();
        if let Some(token) = token {
            // The local token is gone either way; a failed revoke only
            // leaves a row that expires on its own.
            let revoked = self.backend.revoke_session(&token);
            info!("signed out");
            self.emit(AuthEvent::SignedOut);
            revoked?;
        }
        Ok(())
    }
}

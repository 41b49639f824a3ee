use serde::{Deserialize, Serialize};

/// The authenticated identity observed by a client instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub email: String,
}

/// Session-change notifications emitted by the auth service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuthEvent {
    SignedIn(Session),
    SignedOut,
    TokenRefreshed(Session),
}

impl AuthEvent {
    /// The session this event leaves the client with.
    pub fn session(&self) -> Option<&Session> {
        match self {
            AuthEvent::SignedIn(s) | AuthEvent::TokenRefreshed(s) => Some(s),
            AuthEvent::SignedOut => None,
        }
    }
}

/// Where the client must send the user to continue an OAuth sign-in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthRedirect {
    pub provider: String,
    pub url: String,
    pub state: String,
}

/// What the identity provider hands back on the redirect.
///
/// The local provider is trusted, so the verified identity travels with the
/// callback instead of being exchanged for a token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuthCallback {
    pub state: String,
    pub subject: String,
    pub email: String,
}

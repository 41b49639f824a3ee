use thiserror::Error;

// === StoreError ===

/// Errors raised by the bookmark persistence service.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No bookmark with the given ID is owned by the caller.
    #[error("Bookmark not found: {0}")]
    NotFound(String),
    /// Database operation failed.
    #[error("Bookmark database error: {0}")]
    DatabaseError(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

// === AuthError ===

/// Errors raised by the auth service.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The requested OAuth provider is not configured.
    #[error("Unknown OAuth provider: {0}")]
    UnknownProvider(String),
    /// The OAuth `state` did not match a pending sign-in.
    #[error("Invalid OAuth state")]
    InvalidState,
    /// The operation needs a signed-in session.
    #[error("Not signed in")]
    NotSignedIn,
    /// The session was revoked or has expired.
    #[error("Session expired")]
    SessionExpired,
    /// Token generation failed.
    #[error("Token error: {0}")]
    Token(#[from] TokenError),
    /// Database operation failed.
    #[error("Auth database error: {0}")]
    DatabaseError(String),
    /// The locally saved access token could not be read or written.
    #[error("Token storage error: {0}")]
    StorageError(String),
}

impl From<rusqlite::Error> for AuthError {
    fn from(e: rusqlite::Error) -> Self {
        AuthError::DatabaseError(e.to_string())
    }
}

// === TokenError ===

/// Errors related to access token generation.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The system random source failed.
    #[error("Random generation failed: {0}")]
    RandomGeneration(String),
}

// === ConfigError ===

/// Errors related to loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File system error while reading the config file.
    #[error("Config IO error: {0}")]
    IoError(String),
    /// The config file is not valid JSON for `AppConfig`.
    #[error("Config parse error: {0}")]
    SerializationError(String),
    /// A value is present but unusable.
    #[error("Invalid config value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

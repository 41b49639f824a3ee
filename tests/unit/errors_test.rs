use smartmark::types::errors::*;

// === StoreError Tests ===

#[test]
fn store_error_display_variants() {
    assert_eq!(
        StoreError::NotFound("bm-1".to_string()).to_string(),
        "Bookmark not found: bm-1"
    );
    assert_eq!(
        StoreError::DatabaseError("disk full".to_string()).to_string(),
        "Bookmark database error: disk full"
    );
}

#[test]
fn store_error_from_rusqlite() {
    let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
    assert!(matches!(err, StoreError::DatabaseError(_)));
}

// === AuthError Tests ===

#[test]
fn auth_error_display_variants() {
    assert_eq!(
        AuthError::UnknownProvider("myspace".to_string()).to_string(),
        "Unknown OAuth provider: myspace"
    );
    assert_eq!(AuthError::InvalidState.to_string(), "Invalid OAuth state");
    assert_eq!(AuthError::NotSignedIn.to_string(), "Not signed in");
    assert_eq!(AuthError::SessionExpired.to_string(), "Session expired");
    assert_eq!(
        AuthError::DatabaseError("locked".to_string()).to_string(),
        "Auth database error: locked"
    );
    assert_eq!(
        AuthError::StorageError("read-only".to_string()).to_string(),
        "Token storage error: read-only"
    );
}

#[test]
fn auth_error_wraps_token_error_as_source() {
    let err: AuthError = TokenError::RandomGeneration("no entropy".to_string()).into();
    assert_eq!(err.to_string(), "Token error: Random generation failed: no entropy");
    let err: Box<dyn std::error::Error> = Box::new(err);
    assert!(err.source().is_some());
}

// === ConfigError Tests ===

#[test]
fn config_error_display_variants() {
    assert_eq!(
        ConfigError::IoError("denied".to_string()).to_string(),
        "Config IO error: denied"
    );
    assert_eq!(
        ConfigError::SerializationError("eof".to_string()).to_string(),
        "Config parse error: eof"
    );
    assert_eq!(
        ConfigError::InvalidValue {
            key: "session_ttl_secs".to_string(),
            message: "must be positive".to_string(),
        }
        .to_string(),
        "Invalid config value for session_ttl_secs: must be positive"
    );
}

//! Saved access token.
//!
//! A client that keeps its token in the data directory resumes its session
//! after a restart instead of signing the user out. [`TokenPersistence`]
//! mirrors the auth handle's token into the file on every auth event.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::backend::{AuthService, LocalAuth};
use crate::types::errors::AuthError;

pub const TOKEN_FILE_NAME: &str = "session.json";

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct StoredToken {
    access_token: String,
}

#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
}

impl TokenFile {
    pub fn in_dir(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(TOKEN_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The saved token, or `None` when nothing was saved.
    pub fn load(&self) -> Result<Option<Zeroizing<String>>, AuthError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => Zeroizing::new(content),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AuthError::StorageError(format!("Failed to read token file: {}", e)))
            }
        };

        let mut stored: StoredToken = serde_json::from_str(&content)
            .map_err(|e| AuthError::StorageError(format!("Failed to parse token file: {}", e)))?;
        Ok(Some(Zeroizing::new(std::mem::take(&mut stored.access_token))))
    }

    /// Replaces the saved token. The file is written beside the target and
    /// renamed over it, so a crash never leaves half a token behind.
    pub fn save(&self, token: &str) -> Result<(), AuthError> {
        let stored = StoredToken {
            access_token: token.to_string(),
        };
        let content = Zeroizing::new(
            serde_json::to_string(&stored)
                .map_err(|e| AuthError::StorageError(format!("Failed to encode token: {}", e)))?,
        );

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content.as_bytes())
            .map_err(|e| AuthError::StorageError(format!("Failed to write token file: {}", e)))?;
        restrict_permissions(&tmp)?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| AuthError::StorageError(format!("Failed to replace token file: {}", e)))
    }

    /// Removes the saved token. Missing is fine.
    pub fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AuthError::StorageError(format!("Failed to remove token file: {}", e))),
        }
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<(), AuthError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .map_err(|e| AuthError::StorageError(format!("Failed to restrict token file: {}", e)))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<(), AuthError> {
    Ok(())
}

/// Keeps a [`TokenFile`] equal to the token the auth handle holds.
pub struct TokenPersistence {
    task: JoinHandle<()>,
}

impl TokenPersistence {
    /// Subscribes before returning; every later auth event is written back.
    pub fn start(auth: Arc<LocalAuth>, file: TokenFile) -> Self {
        let mut events = auth.subscribe();

        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        debug!(?event, "persisting access token");
                        write_back(&auth, &file);
                    }
                    // Only the latest token matters.
                    Err(RecvError::Lagged(_)) => write_back(&auth, &file),
                    Err(RecvError::Closed) => break,
                }
            }
        });

        Self { task }
    }

    pub fn teardown(&self) {
        self.task.abort();
    }
}

impl Drop for TokenPersistence {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn write_back(auth: &LocalAuth, file: &TokenFile) {
    let result = match auth.access_token() {
        Some(token) => file.save(&token),
        None => file.clear(),
    };
    if let Err(e) = result {
        warn!(error = %e, path = %file.path().display(), "failed to persist access token");
    }
}

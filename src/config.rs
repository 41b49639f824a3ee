//! SmartMark configuration.
//!
//! Settings are read from `smartmark.json` in the data directory when it
//! exists; missing fields fall back to defaults. A few environment variables
//! override the file:
//!
//! - `SMARTMARK_DATA_DIR`: where the database and config file live
//! - `SMARTMARK_LOG`: log level (`RUST_LOG` still wins at runtime)
//! - `SMARTMARK_OAUTH_CLIENT_ID`: client id of the default provider

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::errors::ConfigError;

pub const CONFIG_FILE_NAME: &str = "smartmark.json";
pub const DEFAULT_PROVIDER: &str = "google";
/// Upper bound for `session_ttl_secs`: one year.
pub const MAX_SESSION_TTL_SECS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub database_file: String,
    /// Lifetime of a backend session before it must be refreshed.
    pub session_ttl_secs: i64,
    pub oauth: OAuthConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OAuthConfig {
    pub redirect_url: String,
    pub providers: HashMap<String, ProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderConfig {
    pub authorize_url: String,
    pub client_id: String,
    #[serde(default = "default_scope")]
    pub scope: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json_format: bool,
}

fn default_scope() -> String {
    "openid email".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            database_file: "smartmark.db".to_string(),
            session_ttl_secs: 60 * 60,
            oauth: OAuthConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for OAuthConfig {
    fn default() -> Self {
        let mut providers = HashMap::new();
        providers.insert(
            DEFAULT_PROVIDER.to_string(),
            ProviderConfig {
                authorize_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
                client_id: "smartmark-local".to_string(),
                scope: default_scope(),
            },
        );
        Self {
            redirect_url: "http://localhost:3000/auth/callback".to_string(),
            providers,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Loads configuration using the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Loads configuration, resolving environment variables through `env`.
    pub fn load_with<F>(env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = env("SMARTMARK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut config = Self::from_file(&data_dir.join(CONFIG_FILE_NAME))?;
        config.data_dir = data_dir;

        if let Some(level) = env("SMARTMARK_LOG") {
            config.logging.level = level;
        }
        if let Some(client_id) = env("SMARTMARK_OAUTH_CLIENT_ID") {
            match config.oauth.providers.get_mut(DEFAULT_PROVIDER) {
                Some(provider) => provider.client_id = client_id,
                None => {
                    return Err(ConfigError::InvalidValue {
                        key: "SMARTMARK_OAUTH_CLIENT_ID".to_string(),
                        message: format!("provider '{}' is not configured", DEFAULT_PROVIDER),
                    })
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Reads a config file, returning defaults when it does not exist.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("Failed to read config file: {}", e)))?;

        serde_json::from_str(&content).map_err(|e| {
            ConfigError::SerializationError(format!("Failed to parse config file: {}", e))
        })
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_file)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.session_ttl_secs <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "session_ttl_secs".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.session_ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(ConfigError::InvalidValue {
                key: "session_ttl_secs".to_string(),
                message: format!("must not exceed {} seconds", MAX_SESSION_TTL_SECS),
            });
        }
        if self.database_file.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "database_file".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

//! Token Service for SmartMark.
//!
//! Generates opaque access tokens and OAuth `state` values with the system
//! CSPRNG, and derives the SHA-256 digest the backend stores in place of a
//! raw token.

use std::fmt::Write as _;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::digest::{digest, SHA256};
use ring::rand::{SecureRandom, SystemRandom};
use zeroize::Zeroizing;

use crate::types::errors::TokenError;

/// Access token length in bytes before encoding.
const ACCESS_TOKEN_LENGTH: usize = 32;

/// OAuth `state` length in bytes before encoding.
const STATE_LENGTH: usize = 16;

/// Trait defining token operations used by the auth service.
pub trait TokenServiceTrait {
    /// Returns a fresh URL-safe access token. The buffer is wiped on drop.
    fn generate_access_token(&self) -> Result<Zeroizing<String>, TokenError>;

    /// Returns a fresh URL-safe OAuth `state` value.
    fn generate_state(&self) -> Result<String, TokenError>;

    /// Hex SHA-256 digest of a token, as persisted by the backend.
    fn hash_token(&self, token: &str) -> String;
}

pub struct TokenService {
    rng: SystemRandom,
}

impl TokenService {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    fn random_encoded(&self, length: usize) -> Result<Zeroizing<String>, TokenError> {
        let mut bytes = Zeroizing::new(vec![0u8; length]);
        self.rng
            .fill(bytes.as_mut_slice())
            .map_err(|_| TokenError::RandomGeneration("system random source unavailable".to_string()))?;
        Ok(Zeroizing::new(URL_SAFE_NO_PAD.encode(bytes.as_slice())))
    }
}

impl Default for TokenService {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenServiceTrait for TokenService {
    fn generate_access_token(&self) -> Result<Zeroizing<String>, TokenError> {
        self.random_encoded(ACCESS_TOKEN_LENGTH)
    }

    fn generate_state(&self) -> Result<String, TokenError> {
        Ok(self.random_encoded(STATE_LENGTH)?.as_str().to_string())
    }

    fn hash_token(&self, token: &str) -> String {
        let hash = digest(&SHA256, token.as_bytes());
        let mut hex = String::with_capacity(hash.as_ref().len() * 2);
        for byte in hash.as_ref() {
            let _ = write!(hex, "{:02x}", byte);
        }
        hex
    }
}

//! Password hashing and signed session tokens.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Shortest password accepted at sign-up.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Errors produced while hashing, checking, or verifying credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("password must be at least {MIN_PASSWORD_LEN} characters")]
    WeakPassword,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("invalid session token")]
    InvalidToken,
    #[error("session token expired")]
    Expired,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("unusable token secret")]
    InvalidSecret,
}

/// Hashes passwords and issues/verifies session tokens.
///
/// Token format: `base64url(user_id|expires_unix_secs|hex(hmac_sha256))`.
#[derive(Clone)]
pub struct Authenticator {
    mac: Hmac<Sha256>,
    ttl_secs: u64,
}

impl Authenticator {
    /// Builds an authenticator. An empty `secret` selects a random key.
    pub fn new(secret: &[u8], ttl_secs: u64) -> Result<Self, AuthError> {
        let key = if secret.is_empty() {
            tracing::warn!("no token secret configured, generating an ephemeral one");
            let mut key = [0u8; 32];
            OsRng.fill_bytes(&mut key);
            key.to_vec()
        } else {
            secret.to_vec()
        };

        let mac = Hmac::<Sha256>::new_from_slice(&key).map_err(|_| AuthError::InvalidSecret)?;
        Ok(Self { mac, ttl_secs })
    }

    /// Hashes a new password with Argon2id and a random salt.
    pub fn hash_password(&self, password: &str) -> Result<String, AuthError> {
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::Hash(e.to_string()))
    }

    /// Checks a password against a stored hash.
    pub fn verify_password(&self, password: &str, stored_hash: &str) -> Result<(), AuthError> {
        let parsed = PasswordHash::new(stored_hash).map_err(|e| AuthError::Hash(e.to_string()))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| AuthError::InvalidCredentials)
    }

    /// Issues a session token for `user_id`.
    pub fn issue_token(&self, user_id: i64) -> String {
        self.issue_token_expiring(user_id, now_secs().saturating_add(self.ttl_secs))
    }

    fn issue_token_expiring(&self, user_id: i64, expires: u64) -> String {
        let payload = format!("{user_id}|{expires}");
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());

        base64::engine::general_purpose::URL_SAFE_NO_PAD
            .encode(format!("{payload}|{signature}").as_bytes())
    }

    /// Verifies a session token and returns the user it was issued to.
    pub fn verify_token(&self, token: &str) -> Result<i64, AuthError> {
        let decoded = base64::engine::general_purpose::URL_SAFE_NO_PAD
            .decode(token.as_bytes())
            .map_err(|_| AuthError::InvalidToken)?;
        let token = String::from_utf8(decoded).map_err(|_| AuthError::InvalidToken)?;

        let mut parts = token.splitn(3, '|');
        let (Some(user_id), Some(expires), Some(sig_hex)) =
            (parts.next(), parts.next(), parts.next())
        else {
            return Err(AuthError::InvalidToken);
        };

        let signature = hex::decode(sig_hex).map_err(|_| AuthError::InvalidToken)?;
        let mut mac = self.mac.clone();
        mac.update(format!("{user_id}|{expires}").as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| AuthError::InvalidToken)?;

        let expires: u64 = expires.parse().map_err(|_| AuthError::InvalidToken)?;
        if now_secs() > expires {
            return Err(AuthError::Expired);
        }
        user_id.parse().map_err(|_| AuthError::InvalidToken)
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

//! Sessions & Credentials
//!
//! Password storage (salted, iterated SHA-256) and stateless session
//! tokens (HS256 JWTs). The server both issues and validates tokens;
//! the token subject is the user id, so a reconnecting client can resume
//! its session without replaying credentials.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

/// Hash-stretching rounds for password storage.
const HASH_ROUNDS: u32 = 10_000;

/// Salt length for password hashes, in bytes.
const PASSWORD_SALT_BYTES: usize = 16;

/// Session/authentication configuration.
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// HS256 signing secret for session tokens.
    pub secret: String,
    /// Token lifetime in seconds.
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            // Fresh random secret per process unless configured; restarting
            // the server invalidates outstanding sessions, which is fine.
            secret: random_secret(),
            token_ttl_secs: 24 * 60 * 60,
        }
    }
}

impl AuthConfig {
    /// Create config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            secret: std::env::var("SESSION_SECRET").unwrap_or(defaults.secret),
            token_ttl_secs: std::env::var("SESSION_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.token_ttl_secs),
        }
    }
}

fn random_secret() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the user id.
    pub sub: String,
    /// Issued-at timestamp (Unix seconds).
    pub iat: u64,
    /// Expiry timestamp (Unix seconds).
    pub exp: u64,
}

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token format is invalid.
    #[error("invalid token format")]
    InvalidFormat,
    /// Token signature verification failed.
    #[error("invalid signature")]
    InvalidSignature,
    /// Token has expired.
    #[error("token expired")]
    Expired,
    /// Subject claim is missing or not a user id.
    #[error("invalid subject claim")]
    InvalidSubject,
    /// JWT encoding/decoding error.
    #[error("token error: {0}")]
    TokenError(String),
}

// =============================================================================
// PASSWORD STORAGE
// =============================================================================

fn stretch(salt: &[u8], password: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    let mut digest: [u8; 32] = hasher.finalize().into();

    for _ in 1..HASH_ROUNDS {
        let mut hasher = Sha256::new();
        hasher.update(digest);
        digest = hasher.finalize().into();
    }
    digest
}

/// Hash a password for storage, format `"{hex_salt}${hex_digest}"`.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; PASSWORD_SALT_BYTES];
    OsRng.fill_bytes(&mut salt);
    let digest = stretch(&salt, password);
    format!("{}${}", hex::encode(salt), hex::encode(digest))
}

/// Check a password against a stored hash.
pub fn verify_password(stored: &str, password: &str) -> bool {
    let Some((salt_hex, digest_hex)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    hex::encode(stretch(&salt, password)) == digest_hex
}

// =============================================================================
// SESSION TOKENS
// =============================================================================

/// Issue a session token for a user.
pub fn issue_token(config: &AuthConfig, user_id: Uuid) -> Result<String, AuthError> {
    let now = Utc::now().timestamp() as u64;
    let claims = SessionClaims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + config.token_ttl_secs,
    };

    let key = EncodingKey::from_secret(config.secret.as_bytes());
    encode(&Header::new(Algorithm::HS256), &claims, &key)
        .map_err(|e| AuthError::TokenError(e.to_string()))
}

/// Validate a session token and extract the user id.
pub fn validate_token(config: &AuthConfig, token: &str) -> Result<Uuid, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    let key = DecodingKey::from_secret(config.secret.as_bytes());
    let data = decode::<SessionClaims>(token, &key, &validation).map_err(map_jwt_error)?;

    data.claims
        .sub
        .parse::<Uuid>()
        .map_err(|_| AuthError::InvalidSubject)
}

/// Map JWT library errors to our error type.
fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    use jsonwebtoken::errors::ErrorKind;
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        ErrorKind::InvalidToken | ErrorKind::Base64(_) => AuthError::InvalidFormat,
        _ => AuthError::TokenError(err.to_string()),
    }
}

// =============================================================================
// TESTS
// =============================================================================

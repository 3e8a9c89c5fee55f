//! JWT token issuance and verification.
//!
//! Tokens are stateless: validity is a function of the MAC signature, the
//! `exp` claim and the `type` claim at verification time. Nothing is persisted,
//! so an issued token cannot be revoked before it expires.

use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use thiserror::Error;
use tracing::{info, warn};

use super::AuthError;
use crate::models::auth::{TokenClaims, TokenKind, TokenPair};
use crate::settings::AuthSettings;

/// Why a token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token has expired")]
    Expired,

    #[error("Malformed token")]
    MalformedToken,

    #[error("Expected a {expected} token, got a {found} token")]
    WrongKind { expected: TokenKind, found: TokenKind },
}

/// Signs and verifies access/refresh tokens with a server-held secret.
///
/// Keys are derived once at construction; the codec is read-only afterwards
/// and safe to share across requests.
#[derive(Clone)]
pub struct TokenCodec {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(settings: &AuthSettings) -> Self {
        let secret = settings.secret.as_bytes();
        Self {
            algorithm: settings.algorithm,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            access_ttl: settings.access_token_ttl,
            refresh_ttl: settings.refresh_token_ttl,
        }
    }

    /// Configured lifetime for tokens of `kind`.
    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }

    /// Build and sign a claim set `{sub, iat, exp, type}`.
    ///
    /// A negative `ttl` yields a token that is already expired.
    pub fn issue(&self, subject: &str, kind: TokenKind, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            kind,
        };
        encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| AuthError::Internal(format!("jwt encode: {e}")))
    }

    /// Issue an access + refresh pair with the configured lifetimes.
    pub fn issue_pair(&self, subject: &str) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access_token: self.issue(subject, TokenKind::Access, self.access_ttl)?,
            refresh_token: self.issue(subject, TokenKind::Refresh, self.refresh_ttl)?,
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Verify signature, expiry and kind, returning the claims on success.
    pub fn verify(&self, token: &str, expected: TokenKind) -> Result<TokenClaims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        let claims = decode::<TokenClaims>(token, &self.decoding, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::InvalidSignature
                }
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::MalformedToken,
            })?
            .claims;

        if claims.kind != expected {
            return Err(TokenError::WrongKind {
                expected,
                found: claims.kind,
            });
        }
        Ok(claims)
    }
}

/// Resolve the signing secret when none is configured: the persisted file
/// under the user data directory, generated on first use.
pub fn resolve_jwt_secret() -> String {
    load_or_create_secret(&jwt_secret_path())
}

/// Read the secret at `path`, or generate and persist a new one.
pub fn load_or_create_secret(path: &Path) -> String {
    if let Ok(existing) = std::fs::read_to_string(path) {
        let trimmed = existing.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    let secret: String = rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    match std::fs::write(path, &secret) {
        Ok(()) => info!(path = %path.display(), "generated new JWT secret"),
        Err(e) => warn!(
            path = %path.display(),
            "could not persist generated JWT secret, tokens will not survive a restart: {e}"
        ),
    }
    secret
}

/// Path to the persisted JWT secret file.
fn jwt_secret_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskgate")
        .join("jwt-secret")
}

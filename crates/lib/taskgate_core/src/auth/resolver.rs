//! Identity resolution from an inbound `Authorization` header.
//!
//! Purely structural and cryptographic: the store is never consulted, so a
//! resolved subject may reference an identity that no longer exists. Routes
//! that need the identity record look it up themselves.

use thiserror::Error;

use super::guard::CapabilitySet;
use super::jwt::{TokenCodec, TokenError};
use crate::models::auth::TokenKind;

/// Scheme prefix, case-sensitive.
const BEARER_PREFIX: &str = "Bearer ";

/// The caller behind a verified access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    /// Always empty today: the data model carries no roles.
    pub capabilities: CapabilitySet,
}

impl Identity {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            capabilities: CapabilitySet::default(),
        }
    }
}

/// Why a request could not be attributed to an identity.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("Not authenticated")]
    MissingCredentials,

    #[error("Authorization header must use the Bearer scheme")]
    MalformedHeader,

    #[error("Could not validate credentials: {0}")]
    InvalidToken(#[from] TokenError),

    #[error("Could not validate credentials: token has no subject")]
    SubjectAbsent,
}

/// Per-request authentication state, resolved once and read downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Route is public; resolution was skipped.
    Anonymous,
    Resolved(Identity),
    Failed(AuthFailure),
}

impl AuthOutcome {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            AuthOutcome::Resolved(identity) => Some(identity),
            _ => None,
        }
    }
}

/// Resolve the raw `Authorization` header value into an identity or a tagged
/// failure. Never panics and never touches storage.
pub fn resolve(header: Option<&str>, codec: &TokenCodec) -> AuthOutcome {
    match resolve_identity(header, codec) {
        Ok(identity) => AuthOutcome::Resolved(identity),
        Err(failure) => AuthOutcome::Failed(failure),
    }
}

fn resolve_identity(header: Option<&str>, codec: &TokenCodec) -> Result<Identity, AuthFailure> {
    let header = header.ok_or(AuthFailure::MissingCredentials)?;
    let token = header
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|t| !t.is_empty() && !t.contains(char::is_whitespace))
        .ok_or(AuthFailure::MalformedHeader)?;

    let claims = codec.verify(token, TokenKind::Access)?;
    if claims.sub.trim().is_empty() {
        return Err(AuthFailure::SubjectAbsent);
    }
    Ok(Identity::new(claims.sub))
}

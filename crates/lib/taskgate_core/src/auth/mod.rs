//! Authentication and access-control core.
//!
//! Credential hashing, token issuance/verification, identity resolution from
//! an `Authorization` header, sliding-window rate limiting and the ownership
//! predicate. Nothing in here touches the store or raises past its own
//! boundary: each stage returns a tagged outcome the API layer translates.

pub mod guard;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod resolver;

use thiserror::Error;

pub use jwt::{TokenCodec, TokenError};
pub use password::CredentialHasher;
pub use rate_limit::{RateLimiter, SlidingWindowLimiter};
pub use resolver::{AuthFailure, AuthOutcome, Identity};

/// Authentication flow errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Incorrect email or password")]
    CredentialError,

    #[error("Inactive user")]
    InactiveAccount,

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

//! Password hashing via bcrypt.

use tracing::debug;

use super::AuthError;
use crate::models::auth::HashedCredential;

/// One-way salted password hasher.
///
/// bcrypt compares the recomputed hash against the stored one in constant
/// time, so verification does not leak how many bytes matched.
#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    cost: u32,
}

impl CredentialHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password with a fresh salt.
    pub fn hash(&self, password: &str) -> Result<HashedCredential, AuthError> {
        bcrypt::hash(password, self.cost)
            .map(HashedCredential::from_stored)
            .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
    }

    /// Verify a password against a stored hash.
    ///
    /// A malformed stored hash verifies as `false`.
    pub fn verify(&self, password: &str, hashed: &HashedCredential) -> bool {
        match bcrypt::verify(password, hashed.as_str()) {
            Ok(matches) => matches,
            Err(e) => {
                debug!("stored credential could not be verified: {e}");
                false
            }
        }
    }

    /// Spend the same bcrypt work as [`verify`](Self::verify) when there is no
    /// stored hash to check against. Always `false`.
    ///
    /// Keeps a lookup miss from answering faster than a wrong password.
    pub fn verify_missing(&self, password: &str) -> bool {
        if let Err(e) = bcrypt::hash(password, self.cost) {
            debug!("decoy hash failed: {e}");
        }
        false
    }
}

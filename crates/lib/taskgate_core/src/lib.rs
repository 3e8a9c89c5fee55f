//! # taskgate_core
//!
//! Core domain logic for Taskgate: credential hashing, token codec, identity
//! resolution, rate limiting, ownership checks, and the task rules that sit
//! on top of a [`store::Store`].

pub mod auth;
pub mod migrate;
pub mod models;
pub mod settings;
pub mod store;
pub mod tasks;
pub mod uuid;
pub mod validation;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}

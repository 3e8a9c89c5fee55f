//! API server configuration.

use taskgate_core::settings::{AuthSettings, SettingsError};

/// Default listener address.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8000").
    pub bind_addr: String,
    /// PostgreSQL connection URL. `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// Hasher, token and rate-limit settings.
    pub auth: AuthSettings,
}

impl ApiConfig {
    /// Reads configuration from environment variables.
    ///
    /// | Variable       | Default            |
    /// |----------------|--------------------|
    /// | `BIND_ADDR`    | `127.0.0.1:8000`   |
    /// | `DATABASE_URL` | unset (in-memory)  |
    ///
    /// Auth variables are documented on [`AuthSettings::from_env`].
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ApiConfig::from_env`] but over an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Ok(Self {
            bind_addr: non_empty("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into()),
            database_url: non_empty("DATABASE_URL"),
            auth: AuthSettings::from_lookup(&lookup)?,
        })
    }

    /// Config for tests and embedding: in-memory store, explicit auth settings.
    pub fn with_auth(auth: AuthSettings) -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            database_url: None,
            auth,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_without_environment() {
        let vars = HashMap::from([("JWT_SECRET", "s3cret")]);
        let config = ApiConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.bind_addr, DEFAULT_BIND_ADDR);
        assert!(config.database_url.is_none());
        assert_eq!(config.auth.secret, "s3cret");
    }

    #[test]
    fn blank_database_url_means_memory() {
        let vars = HashMap::from([
            ("JWT_SECRET", "s3cret"),
            ("DATABASE_URL", "  "),
            ("BIND_ADDR", "0.0.0.0:9000"),
        ]);
        let config = ApiConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:9000");
        assert!(config.database_url.is_none());
    }

    #[test]
    fn auth_errors_propagate() {
        let vars = HashMap::from([("JWT_SECRET", "s"), ("BCRYPT_COST", "nope")]);
        assert!(ApiConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).is_err());
    }
}

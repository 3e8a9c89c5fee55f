//! Authentication and rate-limit settings.
//!
//! Built once at startup and handed to each component constructor. Values are
//! read through a lookup function so tests can supply them without touching
//! the process environment.

use std::str::FromStr;
use std::time::Duration;

use jsonwebtoken::Algorithm;
use thiserror::Error;

use crate::auth::jwt::resolve_jwt_secret;

/// Default access token lifetime: 30 minutes.
pub const DEFAULT_ACCESS_TOKEN_MINUTES: i64 = 30;

/// Default refresh token lifetime: 7 days.
pub const DEFAULT_REFRESH_TOKEN_DAYS: i64 = 7;

/// Default bcrypt work factor.
pub const DEFAULT_BCRYPT_COST: u32 = 12;

/// Work factors accepted by bcrypt.
const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

/// Default per-identity budget: 1000 requests per hour.
pub const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 1000;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 3600;

/// Default per-client budget on the unauthenticated auth endpoints.
pub const DEFAULT_PUBLIC_RATE_LIMIT_REQUESTS: u32 = 30;
pub const DEFAULT_PUBLIC_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Errors raised while reading settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{key} must be a valid number, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key} is out of range: {reason}")]
    OutOfRange { key: &'static str, reason: String },

    #[error("unsupported signing algorithm '{0}' (expected HS256, HS384 or HS512)")]
    UnsupportedAlgorithm(String),
}

/// Sliding-window budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    /// Maximum admitted requests per window.
    pub requests: u32,
    pub window: Duration,
}

impl RateLimitSettings {
    pub fn new(requests: u32, window: Duration) -> Self {
        Self { requests, window }
    }
}

/// Settings for the credential hasher, token codec and rate limiters.
#[derive(Clone)]
pub struct AuthSettings {
    /// Symmetric MAC signing secret. Read-only after startup.
    pub secret: String,
    pub algorithm: Algorithm,
    pub access_token_ttl: chrono::Duration,
    pub refresh_token_ttl: chrono::Duration,
    pub bcrypt_cost: u32,
    /// Per-identity limit applied to authenticated routes.
    pub rate_limit: RateLimitSettings,
    /// Per-client limit applied to register/login/refresh.
    pub public_rate_limit: RateLimitSettings,
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("rate_limit", &self.rate_limit)
            .field("public_rate_limit", &self.public_rate_limit)
            .finish()
    }
}

impl AuthSettings {
    /// Defaults around an explicit secret.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            algorithm: Algorithm::HS256,
            access_token_ttl: chrono::Duration::minutes(DEFAULT_ACCESS_TOKEN_MINUTES),
            refresh_token_ttl: chrono::Duration::days(DEFAULT_REFRESH_TOKEN_DAYS),
            bcrypt_cost: DEFAULT_BCRYPT_COST,
            rate_limit: RateLimitSettings::new(
                DEFAULT_RATE_LIMIT_REQUESTS,
                Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
            ),
            public_rate_limit: RateLimitSettings::new(
                DEFAULT_PUBLIC_RATE_LIMIT_REQUESTS,
                Duration::from_secs(DEFAULT_PUBLIC_RATE_LIMIT_WINDOW_SECS),
            ),
        }
    }

    /// Reads settings from environment variables.
    ///
    /// | Variable                            | Default              |
    /// |-------------------------------------|----------------------|
    /// | `JWT_SECRET` / `SECRET_KEY`         | generated & persisted|
    /// | `JWT_ALGORITHM` / `ALGORITHM`       | `HS256`              |
    /// | `ACCESS_TOKEN_EXPIRE_MINUTES`       | `30`                 |
    /// | `REFRESH_TOKEN_EXPIRE_DAYS`         | `7`                  |
    /// | `BCRYPT_COST`                       | `12`                 |
    /// | `RATE_LIMIT_REQUESTS`               | `1000`               |
    /// | `RATE_LIMIT_WINDOW_SECONDS`         | `3600`               |
    /// | `PUBLIC_RATE_LIMIT_REQUESTS`        | `30`                 |
    /// | `PUBLIC_RATE_LIMIT_WINDOW_SECONDS`  | `60`                 |
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads settings through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| lookup(*k))
                .map(|v| v.trim().to_string())
                .find(|v| !v.is_empty())
        };

        let secret = get(&["JWT_SECRET", "SECRET_KEY"]).unwrap_or_else(resolve_jwt_secret);
        let mut settings = Self::with_secret(secret);

        if let Some(name) = get(&["JWT_ALGORITHM", "ALGORITHM"]) {
            settings.algorithm = parse_algorithm(&name)?;
        }
        if let Some(v) = get(&["ACCESS_TOKEN_EXPIRE_MINUTES"]) {
            let minutes = parse_positive::<i64>("ACCESS_TOKEN_EXPIRE_MINUTES", &v)?;
            settings.access_token_ttl = chrono::Duration::minutes(minutes);
        }
        if let Some(v) = get(&["REFRESH_TOKEN_EXPIRE_DAYS"]) {
            let days = parse_positive::<i64>("REFRESH_TOKEN_EXPIRE_DAYS", &v)?;
            settings.refresh_token_ttl = chrono::Duration::days(days);
        }
        if let Some(v) = get(&["BCRYPT_COST"]) {
            let cost = parse_positive::<u32>("BCRYPT_COST", &v)?;
            if !BCRYPT_COST_RANGE.contains(&cost) {
                return Err(SettingsError::OutOfRange {
                    key: "BCRYPT_COST",
                    reason: format!(
                        "must be between {} and {}",
                        BCRYPT_COST_RANGE.start(),
                        BCRYPT_COST_RANGE.end()
                    ),
                });
            }
            settings.bcrypt_cost = cost;
        }
        if let Some(v) = get(&["RATE_LIMIT_REQUESTS"]) {
            settings.rate_limit.requests = parse_positive("RATE_LIMIT_REQUESTS", &v)?;
        }
        if let Some(v) = get(&["RATE_LIMIT_WINDOW_SECONDS"]) {
            settings.rate_limit.window =
                Duration::from_secs(parse_positive("RATE_LIMIT_WINDOW_SECONDS", &v)?);
        }
        if let Some(v) = get(&["PUBLIC_RATE_LIMIT_REQUESTS"]) {
            settings.public_rate_limit.requests = parse_positive("PUBLIC_RATE_LIMIT_REQUESTS", &v)?;
        }
        if let Some(v) = get(&["PUBLIC_RATE_LIMIT_WINDOW_SECONDS"]) {
            settings.public_rate_limit.window =
                Duration::from_secs(parse_positive("PUBLIC_RATE_LIMIT_WINDOW_SECONDS", &v)?);
        }

        Ok(settings)
    }
}

/// Only symmetric MAC algorithms are accepted.
fn parse_algorithm(name: &str) -> Result<Algorithm, SettingsError> {
    match Algorithm::from_str(&name.to_ascii_uppercase()) {
        Ok(alg @ (Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512)) => Ok(alg),
        _ => Err(SettingsError::UnsupportedAlgorithm(name.to_string())),
    }
}

fn parse_positive<T>(key: &'static str, value: &str) -> Result<T, SettingsError>
where
    T: FromStr + PartialOrd + Default,
{
    let parsed = value
        .parse::<T>()
        .map_err(|_| SettingsError::InvalidNumber {
            key,
            value: value.to_string(),
        })?;
    if parsed <= T::default() {
        return Err(SettingsError::OutOfRange {
            key,
            reason: "must be greater than zero".into(),
        });
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let s = AuthSettings::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(s.secret, "s3cret");
        assert_eq!(s.algorithm, Algorithm::HS256);
        assert_eq!(s.access_token_ttl, chrono::Duration::minutes(30));
        assert_eq!(s.refresh_token_ttl, chrono::Duration::days(7));
        assert_eq!(s.bcrypt_cost, 12);
        assert_eq!(s.rate_limit.requests, 1000);
        assert_eq!(s.rate_limit.window, Duration::from_secs(3600));
    }

    #[test]
    fn secret_key_alias_is_accepted() {
        let s = AuthSettings::from_lookup(lookup(&[("SECRET_KEY", "legacy")])).unwrap();
        assert_eq!(s.secret, "legacy");
    }

    #[test]
    fn overrides_are_parsed() {
        let s = AuthSettings::from_lookup(lookup(&[
            ("JWT_SECRET", "x"),
            ("ALGORITHM", "hs512"),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "5"),
            ("REFRESH_TOKEN_EXPIRE_DAYS", "1"),
            ("BCRYPT_COST", "4"),
            ("RATE_LIMIT_REQUESTS", "10"),
            ("RATE_LIMIT_WINDOW_SECONDS", "60"),
            ("PUBLIC_RATE_LIMIT_REQUESTS", "3"),
            ("PUBLIC_RATE_LIMIT_WINDOW_SECONDS", "10"),
        ]))
        .unwrap();
        assert_eq!(s.algorithm, Algorithm::HS512);
        assert_eq!(s.access_token_ttl, chrono::Duration::minutes(5));
        assert_eq!(s.refresh_token_ttl, chrono::Duration::days(1));
        assert_eq!(s.bcrypt_cost, 4);
        assert_eq!(s.rate_limit, RateLimitSettings::new(10, Duration::from_secs(60)));
        assert_eq!(s.public_rate_limit, RateLimitSettings::new(3, Duration::from_secs(10)));
    }

    #[test]
    fn asymmetric_algorithms_are_rejected() {
        let err = AuthSettings::from_lookup(lookup(&[("JWT_SECRET", "x"), ("JWT_ALGORITHM", "RS256")]))
            .unwrap_err();
        assert_eq!(err, SettingsError::UnsupportedAlgorithm("RS256".into()));
    }

    #[test]
    fn bad_numbers_are_reported_with_their_key() {
        let err = AuthSettings::from_lookup(lookup(&[
            ("JWT_SECRET", "x"),
            ("RATE_LIMIT_REQUESTS", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, SettingsError::InvalidNumber { key: "RATE_LIMIT_REQUESTS", .. }));

        let err = AuthSettings::from_lookup(lookup(&[("JWT_SECRET", "x"), ("RATE_LIMIT_WINDOW_SECONDS", "0")]))
            .unwrap_err();
        assert!(matches!(err, SettingsError::OutOfRange { .. }));

        let err = AuthSettings::from_lookup(lookup(&[("JWT_SECRET", "x"), ("BCRYPT_COST", "40")]))
            .unwrap_err();
        assert!(matches!(err, SettingsError::OutOfRange { key: "BCRYPT_COST", .. }));
    }

    #[test]
    fn debug_redacts_secret() {
        let s = AuthSettings::with_secret("do-not-print");
        assert!(!format!("{s:?}").contains("do-not-print"));
    }
}

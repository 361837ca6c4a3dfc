//! Server configuration, read from the environment (and `.env` when present).
//!
//! | variable                 | default                     |
//! |--------------------------|-----------------------------|
//! | `ENVIRONMENT`            | `development`               |
//! | `DATABASE_URL`           | `sqlite::memory:`           |
//! | `BIND_ADDR`              | `0.0.0.0:3000`              |
//! | `AUTO_MIGRATE`           | `true`                      |
//! | `JWT_SECRET`             | dev-only value              |
//! | `JWT_REFRESH_SECRET`     | dev-only value              |
//! | `ACCESS_TOKEN_TTL_SECS`  | `900` (1 s to 366 days)     |
//! | `REFRESH_TOKEN_TTL_SECS` | `604800` (1 s to 366 days)  |
//! | `RESPONSE_UTC_OFFSET`    | `+00:00`                    |
//! | `MAX_PAGE_SIZE`          | `1000`                      |
//! | `QUERY_JSON_ON_ERROR`    | `fail` (`fail` or `ignore`) |

use chrono::{FixedOffset, Offset, Utc};

use crate::filtering::{
    OnError, QueryOptions,
    embedded::MergeOptions,
    parse::parse_bool_loose,
    query::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE},
};

/// Secrets shorter than this are rejected outside development
const MIN_SECRET_LENGTH: usize = 32;

/// Longest accepted token lifetime
pub const MAX_TOKEN_TTL_SECS: i64 = 366 * 24 * 60 * 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in {1} environment")]
    Missing(&'static str, String),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Token signing settings
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            access_secret: "dev-JWT_SECRET-not-for-production-0000".to_string(),
            refresh_secret: "dev-JWT_REFRESH_SECRET-not-for-production".to_string(),
            access_ttl_secs: 15 * 60,
            refresh_ttl_secs: 7 * 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// development | staging | production
    pub environment: String,
    pub database_url: String,
    pub bind_addr: String,
    /// Run migrations on startup
    pub auto_migrate: bool,
    pub tokens: TokenSettings,
    /// Offset timestamps are rendered in
    pub response_offset: FixedOffset,
    pub query: QueryOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            database_url: "sqlite::memory:".to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            auto_migrate: true,
            tokens: TokenSettings::default(),
            response_offset: Utc.fix(),
            query: QueryOptions::default(),
        }
    }
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Err(err) = dotenvy::dotenv() {
            tracing::debug!(%err, "no .env file loaded");
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let environment = get("ENVIRONMENT").unwrap_or(defaults.environment);
        let is_development = environment == "development";

        let secret = |name: &'static str, fallback: String| -> Result<String, ConfigError> {
            match get(name).filter(|v| !v.is_empty()) {
                Some(value) if !is_development && value.len() < MIN_SECRET_LENGTH => Err(ConfigError::Invalid {
                    name,
                    reason: format!("must be at least {MIN_SECRET_LENGTH} characters"),
                }),
                Some(value) => Ok(value),
                None if is_development => Ok(fallback),
                None => Err(ConfigError::Missing(name, environment.clone())),
            }
        };
        let number = |name: &'static str, fallback: i64| -> Result<i64, ConfigError> {
            get(name).map_or(Ok(fallback), |raw| {
                raw.trim().parse::<i64>().map_err(|e| ConfigError::Invalid {
                    name,
                    reason: e.to_string(),
                })
            })
        };

        let ttl = |name: &'static str, fallback: i64| -> Result<i64, ConfigError> {
            let secs = number(name, fallback)?;
            if (1..=MAX_TOKEN_TTL_SECS).contains(&secs) {
                Ok(secs)
            } else {
                Err(ConfigError::Invalid {
                    name,
                    reason: format!("must be between 1 and {MAX_TOKEN_TTL_SECS} seconds"),
                })
            }
        };

        let tokens = TokenSettings {
            access_secret: secret("JWT_SECRET", defaults.tokens.access_secret)?,
            refresh_secret: secret("JWT_REFRESH_SECRET", defaults.tokens.refresh_secret)?,
            access_ttl_secs: ttl("ACCESS_TOKEN_TTL_SECS", defaults.tokens.access_ttl_secs)?,
            refresh_ttl_secs: ttl("REFRESH_TOKEN_TTL_SECS", defaults.tokens.refresh_ttl_secs)?,
        };

        let response_offset = match get("RESPONSE_UTC_OFFSET") {
            Some(raw) => raw.trim().parse::<FixedOffset>().map_err(|e| ConfigError::Invalid {
                name: "RESPONSE_UTC_OFFSET",
                reason: e.to_string(),
            })?,
            None => defaults.response_offset,
        };

        let default_max = i64::try_from(MAX_PAGE_SIZE).unwrap_or(i64::MAX);
        let max_page_size = u64::try_from(number("MAX_PAGE_SIZE", default_max)?)
            .ok()
            .filter(|size| *size >= 1)
            .ok_or(ConfigError::Invalid {
                name: "MAX_PAGE_SIZE",
                reason: "must be a positive integer".to_string(),
            })?;

        let on_error = match get("QUERY_JSON_ON_ERROR").as_deref().map(str::trim) {
            None | Some("fail") => OnError::Fail,
            Some("ignore") => OnError::Ignore,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "QUERY_JSON_ON_ERROR",
                    reason: format!("expected `fail` or `ignore`, got `{other}`"),
                });
            }
        };

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
            auto_migrate: get("AUTO_MIGRATE")
                .and_then(|raw| parse_bool_loose(&raw))
                .unwrap_or(defaults.auto_migrate),
            tokens,
            response_offset,
            query: QueryOptions {
                default_page_size: DEFAULT_PAGE_SIZE.min(max_page_size),
                max_page_size,
                merge: MergeOptions::default().with_on_error(on_error),
            },
            environment,
        })
    }
}

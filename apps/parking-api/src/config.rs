//! Parking API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to
//! defaults. A `.env` file in the working directory is read first (see
//! `main.rs`), so local overrides never need to be exported by hand.
//!
//! | Variable                            | Default              |
//! |-------------------------------------|----------------------|
//! | `PARKING_HTTP_PORT`                 | 3000                 |
//! | `PARKING_DATABASE_PATH`             | `./data/parking.db`  |
//! | `PARKING_DB_MAX_CONNECTIONS`        | 5                    |
//! | `PARKING_JWT_SECRET`                | development secret   |
//! | `PARKING_JWT_ACCESS_LIFETIME_SECS`  | 3600                 |
//! | `PARKING_VARIANCE_WARN_THRESHOLD`   | 1000 (minor units)   |
//! | `PARKING_CORS_ORIGIN`               | any origin           |

use std::env;
use std::str::FromStr;

use parking_core::Money;
use serde::Serialize;

/// Secret used when `PARKING_JWT_SECRET` is not set.
pub const DEV_JWT_SECRET: &str = "parking-dev-secret-change-in-production";

/// Parking API configuration.
#[derive(Debug, Clone, Serialize)]
pub struct ApiConfig {
    /// HTTP server port
    pub http_port: u16,

    /// SQLite database file
    pub database_path: String,

    pub db_max_connections: u32,

    /// JWT secret key for validating tokens (HS256)
    #[serde(skip_serializing)]
    pub jwt_secret: String,

    /// JWT access token lifetime in seconds
    pub jwt_access_lifetime_secs: i64,

    /// |variance| at or above this amount adds a warning to a shift close.
    /// Zero disables the warning.
    pub variance_warn_threshold: Money,

    /// Allowed CORS origin; `None` allows any origin.
    pub cors_origin: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            http_port: 3000,
            database_path: "./data/parking.db".to_string(),
            db_max_connections: 5,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_access_lifetime_secs: 3600,
            variance_warn_threshold: Money::from_minor(1000),
            cors_origin: None,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = ApiConfig::default();

        let threshold: i64 = parse_or(
            &get,
            "PARKING_VARIANCE_WARN_THRESHOLD",
            defaults.variance_warn_threshold.minor(),
        )?;
        if threshold < 0 {
            return Err(ConfigError::InvalidValue(
                "PARKING_VARIANCE_WARN_THRESHOLD".to_string(),
            ));
        }

        let config = ApiConfig {
            http_port: parse_or(&get, "PARKING_HTTP_PORT", defaults.http_port)?,

            database_path: get("PARKING_DATABASE_PATH").unwrap_or(defaults.database_path),

            db_max_connections: parse_or(
                &get,
                "PARKING_DB_MAX_CONNECTIONS",
                defaults.db_max_connections,
            )?,

            jwt_secret: get("PARKING_JWT_SECRET").unwrap_or(defaults.jwt_secret),

            jwt_access_lifetime_secs: parse_or(
                &get,
                "PARKING_JWT_ACCESS_LIFETIME_SECS",
                defaults.jwt_access_lifetime_secs,
            )?,

            variance_warn_threshold: Money::from_minor(threshold),

            cors_origin: get("PARKING_CORS_ORIGIN"),
        };

        if config.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "PARKING_DB_MAX_CONNECTIONS".to_string(),
            ));
        }

        if config.jwt_access_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue(
                "PARKING_JWT_ACCESS_LIFETIME_SECS".to_string(),
            ));
        }

        Ok(config)
    }

    /// True when tokens are validated with the built-in development secret.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

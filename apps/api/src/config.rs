//! API configuration module.
//!
//! Configuration is loaded from environment variables with fallback to defaults.

use std::env;
use std::path::PathBuf;

use chrono_tz::Tz;

const DEV_JWT_SECRET: &str = "tally-dev-secret-change-in-production";

/// API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// HTTP listen port
    pub server_port: u16,

    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size
    pub database_max_connections: u32,

    /// JWT secret key for signing tokens
    pub jwt_secret: String,

    /// JWT lifetime in seconds
    pub jwt_lifetime_secs: i64,

    /// Zone for day boundaries when a request carries no `tz`
    pub timezone: Tz,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Ok(ApiConfig {
            server_port: parse_var("SERVER_PORT", "8080")?,

            database_path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./tally.db".to_string()),
            ),

            database_max_connections: parse_var("DATABASE_MAX_CONNECTIONS", "5")?,

            jwt_secret: env::var("JWT_SECRET").unwrap_or_else(|_| DEV_JWT_SECRET.to_string()),

            jwt_lifetime_secs: parse_var("JWT_LIFETIME_SECS", "86400")?, // 1 day

            timezone: parse_var("TIMEZONE", "UTC")?,
        })
    }

    /// True while the signing key is the built-in development one.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }

    /// Configuration for tests: in-memory paths are the caller's business.
    pub fn for_tests() -> Self {
        ApiConfig {
            server_port: 0,
            database_path: PathBuf::from(":memory:"),
            database_max_connections: 1,
            jwt_secret: "test-secret".to_string(),
            jwt_lifetime_secs: 3600,
            timezone: chrono_tz::UTC,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: &str) -> Result<T, ConfigError> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name.to_string()))
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_falls_back_to_default() {
        let port: u16 = parse_var("TALLY_TEST_UNSET_PORT", "8080").unwrap();
        assert_eq!(port, 8080);
        let tz: Tz = parse_var("TALLY_TEST_UNSET_TZ", "Asia/Jakarta").unwrap();
        assert_eq!(tz, chrono_tz::Asia::Jakarta);
    }

    #[test]
    fn test_parse_var_rejects_garbage_default() {
        let err = parse_var::<u16>("TALLY_TEST_UNSET_PORT", "eighty").unwrap_err();
        assert_eq!(err.to_string(), "Invalid value for TALLY_TEST_UNSET_PORT");
    }
}

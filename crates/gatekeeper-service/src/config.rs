//! Environment-driven service configuration.

use std::fmt::Display;
use std::str::FromStr;

use thiserror::Error;

/// A configuration value that could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The variable is set but its value is unusable.
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// Environment variable name.
        key: &'static str,
        /// What is wrong with the value.
        reason: String,
    },
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(format!("expected `json` or `pretty`, got `{other}`")),
        }
    }
}

/// Runtime settings for the service process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// PostgreSQL connection string; events stay in memory when absent.
    pub database_url: Option<String>,
    /// Upper bound of the connection pool.
    pub database_max_connections: u32,
    /// Buffered events per subscriber of the in-process publisher.
    pub publisher_capacity: usize,
    /// Log output format.
    pub log_format: LogFormat,
}

impl ServiceConfig {
    /// Default `DATABASE_MAX_CONNECTIONS`.
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
    /// Default `PUBLISHER_CAPACITY`.
    pub const DEFAULT_PUBLISHER_CAPACITY: usize = 1024;

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a variable is set to an unusable
    /// value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable name
    /// to its value.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a variable is set to an unusable
    /// value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let database_max_connections = parse_or(
            &lookup,
            "DATABASE_MAX_CONNECTIONS",
            Self::DEFAULT_MAX_CONNECTIONS,
        )?;
        let publisher_capacity =
            parse_or(&lookup, "PUBLISHER_CAPACITY", Self::DEFAULT_PUBLISHER_CAPACITY)?;
        let log_format = parse_or(&lookup, "LOG_FORMAT", LogFormat::default())?;

        if database_max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "DATABASE_MAX_CONNECTIONS",
                reason: "must be at least 1".into(),
            });
        }
        if publisher_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "PUBLISHER_CAPACITY",
                reason: "must be at least 1".into(),
            });
        }

        Ok(Self {
            database_url,
            database_max_connections,
            publisher_capacity,
            log_format,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        }),
    }
}

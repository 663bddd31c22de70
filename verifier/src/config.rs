//! Configuration management for the verifier service.
//!
//! Loads configuration from environment variables with defaults. A variable
//! that is set but cannot be parsed is an error rather than silently
//! replaced by its default.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use thiserror::Error;

/// Invalid configuration value
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable is set to something that does not parse
    #[error("invalid value {value:?} for {key}")]
    Invalid {
        /// Environment variable name
        key: &'static str,
        /// Rejected value
        value: String,
    },
}

/// Service configuration loaded from environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Log filter used when `RUST_LOG` is unset
    pub log_level: String,
}

impl Config {
    /// Load configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable is set but does not
    /// parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to
    /// its value
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable is set but does not
    /// parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            server: ServerConfig {
                host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                port: parse_or(&lookup, "PORT", 2122)?,
                log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            },
        })
    }
}

impl ServerConfig {
    /// `host:port` to bind
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.server.bind_address(), "0.0.0.0:2122");
        assert_eq!(config.server.log_level, "info");
    }

    #[test]
    fn values_are_read_from_the_environment() {
        let config = Config::from_lookup(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", " 8080 "),
            ("RUST_LOG", "debug"),
        ]))
        .unwrap();

        assert_eq!(config.server.bind_address(), "127.0.0.1:8080");
        assert_eq!(config.server.log_level, "debug");
    }

    #[test]
    fn unparseable_value_is_rejected() {
        let error = Config::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();

        assert_eq!(
            error,
            ConfigError::Invalid {
                key: "PORT",
                value: "eighty".to_string(),
            }
        );
    }
}

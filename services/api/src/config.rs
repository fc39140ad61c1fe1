//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

pub const DEFAULT_GEO_URL: &str = "https://cdn.jsdelivr.net/npm/world-atlas@2/countries-110m.json";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub geo_url: String,
    pub map_max_zoom: f64,
    pub cors_origin: String,
    /// Base URL used when building password-reset links.
    pub public_url: String,
    pub run_migrations: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Load Server and Database Settings ---
        let bind_address_str = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let run_migrations = match lookup("RUN_MIGRATIONS") {
            None => true,
            Some(v) => v.parse::<bool>().map_err(|_| {
                ConfigError::InvalidValue(
                    "RUN_MIGRATIONS".to_string(),
                    format!("'{}' is not true or false", v),
                )
            })?,
        };

        // --- Load Map Settings ---
        let geo_url = lookup("GEO_URL").unwrap_or_else(|| DEFAULT_GEO_URL.to_string());

        let map_max_zoom = match lookup("MAP_MAX_ZOOM") {
            None => travel_tracker_core::viewport::DEFAULT_MAX_ZOOM,
            Some(v) => match v.parse::<f64>() {
                Ok(zoom) if zoom.is_finite() && zoom >= 1.0 => zoom,
                _ => {
                    return Err(ConfigError::InvalidValue(
                        "MAP_MAX_ZOOM".to_string(),
                        format!("'{}' must be a number of at least 1", v),
                    ))
                }
            },
        };

        // --- Load Web Settings ---
        let cors_origin =
            lookup("CORS_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());
        let public_url = lookup("PUBLIC_URL")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            geo_url,
            map_max_zoom,
            cors_origin,
            public_url,
            run_migrations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/tt")])).unwrap();
        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.geo_url, DEFAULT_GEO_URL);
        assert_eq!(config.map_max_zoom, 4.0);
        assert!(config.run_migrations);
    }

    #[test]
    fn test_missing_database_url() {
        let err = Config::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(var) if var == "DATABASE_URL"));
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/tt"),
            ("MAP_MAX_ZOOM", "0.5"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "MAP_MAX_ZOOM"));

        let err = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/tt"),
            ("BIND_ADDRESS", "not-an-address"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(var, _) if var == "BIND_ADDRESS"));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/tt"),
            ("MAP_MAX_ZOOM", "50"),
            ("PUBLIC_URL", "https://tracker.example.com/"),
            ("RUN_MIGRATIONS", "false"),
            ("RUST_LOG", "debug"),
        ]))
        .unwrap();
        assert_eq!(config.map_max_zoom, 50.0);
        assert_eq!(config.public_url, "https://tracker.example.com");
        assert!(!config.run_migrations);
        assert_eq!(config.log_level, Level::DEBUG);
    }
}

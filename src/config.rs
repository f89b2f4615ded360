//! Engine configuration: SQLite database path, HTTP bind address, and the
//! variable-length-path hop bound. Same env-var/CLI/validate shape as a
//! typical ambient `ServerConfig` — environment first, CLI flags override.

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::Validate;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Runtime configuration for the engine and its ambient HTTP façade.
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path to the SQLite database file holding `nodes`/`edges`.
    #[validate(length(min = 1, message = "database path cannot be empty"))]
    pub database_path: String,

    /// HTTP server host address.
    #[validate(length(min = 1, message = "HTTP host cannot be empty"))]
    pub http_host: String,

    /// HTTP server port (1-65535).
    #[validate(range(min = 1, max = 65535, message = "HTTP port must be between 1 and 65535"))]
    pub http_port: u16,

    /// Hop count used for an edge pattern like `-[*]-` with no explicit bound.
    /// Open question in the design: this is an arbitrary policy, exposed here
    /// rather than hard-coded so deployments can document/override it.
    #[validate(range(min = 1, max = 1000, message = "default max hops must be between 1 and 1000"))]
    pub default_max_hops: u32,

    /// Hard ceiling on recursive CTE depth regardless of a query's own `*..N`.
    #[validate(range(min = 1, max = 10000, message = "max CTE depth must be between 1 and 10000"))]
    pub max_cte_depth: u32,

    /// Whether to cache parsed/translated statement lists across queries.
    pub query_cache_enabled: bool,

    /// Capacity of the query cache (number of distinct Cypher texts).
    #[validate(range(min = 1, message = "query cache capacity must be positive"))]
    pub query_cache_capacity: usize,

    /// Whether to run the HTTP server in daemon mode.
    pub daemon: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: "cypher_relay.sqlite".to_string(),
            http_host: "0.0.0.0".to_string(),
            http_port: 8080,
            default_max_hops: 10,
            max_cte_depth: 100,
            query_cache_enabled: true,
            query_cache_capacity: 256,
            daemon: false,
        }
    }
}

impl EngineConfig {
    /// Build configuration from environment variables, validating the result.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            database_path: env::var("CYPHER_RELAY_DB")
                .unwrap_or_else(|_| "cypher_relay.sqlite".to_string()),
            http_host: env::var("CYPHER_RELAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            http_port: parse_env_var("CYPHER_RELAY_PORT", "8080")?,
            default_max_hops: parse_env_var("CYPHER_RELAY_DEFAULT_MAX_HOPS", "10")?,
            max_cte_depth: parse_env_var("CYPHER_RELAY_MAX_CTE_DEPTH", "100")?,
            query_cache_enabled: parse_env_var("CYPHER_RELAY_QUERY_CACHE", "true")?,
            query_cache_capacity: parse_env_var("CYPHER_RELAY_QUERY_CACHE_CAPACITY", "256")?,
            daemon: false,
        };
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from parsed CLI arguments, validating the result.
    pub fn from_cli(cli: CliConfig) -> Result<Self, ConfigError> {
        let config = Self {
            database_path: cli.database_path,
            http_host: cli.http_host,
            http_port: cli.http_port,
            default_max_hops: cli.default_max_hops,
            max_cte_depth: cli.max_cte_depth,
            query_cache_enabled: !cli.disable_query_cache,
            query_cache_capacity: cli.query_cache_capacity,
            daemon: cli.daemon,
        };
        config.validate()?;
        Ok(config)
    }

    /// CLI values take precedence over env-derived values.
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }
}

/// CLI-parsed configuration, converted into [`EngineConfig`] by `main.rs`.
#[derive(Clone, Debug)]
pub struct CliConfig {
    pub database_path: String,
    pub http_host: String,
    pub http_port: u16,
    pub default_max_hops: u32,
    pub max_cte_depth: u32,
    pub disable_query_cache: bool,
    pub query_cache_capacity: usize,
    pub daemon: bool,
}

fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.default_max_hops, 10);
    }

    #[test]
    fn invalid_port_rejected() {
        let config = EngineConfig {
            http_port: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_cte_depth_rejected() {
        let config = EngineConfig {
            max_cte_depth: 100_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_database_path_rejected() {
        let config = EngineConfig {
            database_path: String::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}

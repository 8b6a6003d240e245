//! Configuration loader for the `plantflow` backend service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase: components
//! receive a `Config` built once at startup and never read the environment
//! themselves.

use std::env;

use anyhow::{anyhow, Result};

/// Parse an optional integer environment variable with a default value.
macro_rules! parse_env_u32 {
    ($var_name:expr, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<u32>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Parse an optional string environment variable with a default value.
macro_rules! env_or {
    ($var_name:expr, $default:expr) => {
        env::var($var_name).unwrap_or_else(|_| $default.to_string())
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Plant API base URL.
    pub api_url: String,

    /// Highest plant id fetched per run; the range is `0..=api_max_plant_id`.
    pub api_max_plant_id: u32,

    /// Schema receiving each run's rows, pruned on a 24-hour window.
    pub short_term_schema: String,

    /// Append-only archival schema, populated by migration.
    pub long_term_schema: String,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
/// - `PLANT_API_URL` – Plant API base URL
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `API_MAX_PLANT_ID` – top of the plant id range (default: 50)
/// - `SHORT_TERM_SCHEMA` – hot schema name (default: `short_term`)
/// - `LONG_TERM_SCHEMA` – archive schema name (default: `long_term`)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = require_env!("DATABASE_URL");
    let api_url = require_env!("PLANT_API_URL");
    let db_pool_max = parse_env_u32!("DB_POOL_MAX", 5);
    let api_max_plant_id = parse_env_u32!("API_MAX_PLANT_ID", 50);
    let short_term_schema = env_or!("SHORT_TERM_SCHEMA", "short_term");
    let long_term_schema = env_or!("LONG_TERM_SCHEMA", "long_term");

    // Schema names are interpolated into statements, so they must be
    // plain identifiers.
    for schema in [&short_term_schema, &long_term_schema] {
        validate_schema_name(schema)?;
    }

    Ok(Config {
        db_url,
        db_pool_max,
        api_url,
        api_max_plant_id,
        short_term_schema,
        long_term_schema,
    })
}

/// Reject schema names that are not simple SQL identifiers.
fn validate_schema_name(name: &str) -> Result<()> {
    // ---
    let valid = !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(anyhow!("invalid schema name: {name:?}"))
    }
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks sensitive information like database passwords while showing
    /// all configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        // Mask the password in the database URL for security
        let masked_db_url = if let Some(at_pos) = self.db_url.rfind('@') {
            if let Some(colon_pos) = self.db_url[..at_pos].rfind(':') {
                format!(
                    "{}:****{}",
                    &self.db_url[..colon_pos],
                    &self.db_url[at_pos..]
                )
            } else {
                self.db_url.clone()
            }
        } else {
            self.db_url.clone()
        };

        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL      : {}", masked_db_url);
        tracing::info!("  PLANT_API_URL     : {}", self.api_url);
        tracing::info!("  DB_POOL_MAX       : {}", self.db_pool_max);
        tracing::info!("  API_MAX_PLANT_ID  : {}", self.api_max_plant_id);
        tracing::info!("  SHORT_TERM_SCHEMA : {}", self.short_term_schema);
        tracing::info!("  LONG_TERM_SCHEMA  : {}", self.long_term_schema);
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn schema_name_validation() {
        // ---
        assert!(validate_schema_name("short_term").is_ok());
        assert!(validate_schema_name("lt2").is_ok());

        assert!(validate_schema_name("").is_err());
        assert!(validate_schema_name("2fast").is_err());
        assert!(validate_schema_name("bad-name").is_err());
        assert!(validate_schema_name("drop table; --").is_err());
    }
}

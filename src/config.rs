//! Configuration loader for the `air-quality-context` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). By consolidating configuration logic here, we
//! avoid scattering `env::var` calls throughout the codebase.
//!
use std::env;
use std::str::FromStr;

use anyhow::{anyhow, bail, Result};
use sqlx::postgres::{PgConnectOptions, PgSslMode};

/// Parse an optional typed environment variable with a default value.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.parse::<$ty>())
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

/// Where observations are persisted.
#[derive(Debug, Clone)]
pub enum DatabaseConfig {
    // ---
    Postgres {
        host: String,
        user: String,
        name: String,
        password: String,
        ssl_mode: String,
    },
    /// SQLite database URL, e.g. `sqlite::memory:` or `sqlite://aqo.db`.
    Sqlite { url: String },
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// Port the HTTP server listens on.
    pub port: u16,

    /// Database backend and its connection parameters.
    pub database: DatabaseConfig,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,
}

/// Load configuration from environment variables with defaults.
///
/// Required when `SQLDB_DRIVER` is `postgres` (the default):
/// - `SQLDB_HOST`, `SQLDB_USER`, `SQLDB_NAME`
///
/// Optional:
/// - `SERVICE_PORT` – listening port (default: 8080)
/// - `SQLDB_DRIVER` – `postgres` or `sqlite` (default: postgres)
/// - `SQLDB_PASSWORD` – database password (default: empty)
/// - `SQLDB_SSLMODE` – PostgreSQL ssl mode (default: disable)
/// - `SQLITE_URL` – SQLite database URL (default: sqlite::memory:)
/// - `DB_POOL_MAX` – max DB connections (default: 5)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let port = parse_env!("SERVICE_PORT", u16, 8080);
    let db_pool_max = parse_env!("DB_POOL_MAX", u32, 5);

    let driver = env::var("SQLDB_DRIVER").unwrap_or_else(|_| "postgres".to_string());
    let database = match driver.as_str() {
        "postgres" => DatabaseConfig::Postgres {
            host: require_env!("SQLDB_HOST"),
            user: require_env!("SQLDB_USER"),
            name: require_env!("SQLDB_NAME"),
            password: env::var("SQLDB_PASSWORD").unwrap_or_default(),
            ssl_mode: env::var("SQLDB_SSLMODE").unwrap_or_else(|_| "disable".to_string()),
        },
        "sqlite" => DatabaseConfig::Sqlite {
            url: env::var("SQLITE_URL").unwrap_or_else(|_| "sqlite::memory:".to_string()),
        },
        other => bail!("Invalid SQLDB_DRIVER: {other} (expected postgres or sqlite)"),
    };

    Ok(Config {
        port,
        database,
        db_pool_max,
    })
}

impl DatabaseConfig {
    // ---
    /// PostgreSQL connect options, or `None` for SQLite.
    pub fn pg_connect_options(&self) -> Result<Option<PgConnectOptions>> {
        // ---
        match self {
            Self::Postgres {
                host,
                user,
                name,
                password,
                ssl_mode,
            } => {
                let ssl_mode = PgSslMode::from_str(ssl_mode)
                    .map_err(|e| anyhow!("Invalid SQLDB_SSLMODE {ssl_mode:?}: {e}"))?;

                Ok(Some(
                    PgConnectOptions::new()
                        .host(host)
                        .username(user)
                        .database(name)
                        .password(password)
                        .ssl_mode(ssl_mode),
                ))
            }
            Self::Sqlite { .. } => Ok(None),
        }
    }
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the database password while showing all other values.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  SERVICE_PORT   : {}", self.port);
        tracing::info!("  DB_POOL_MAX    : {}", self.db_pool_max);

        match &self.database {
            DatabaseConfig::Postgres {
                host,
                user,
                name,
                password,
                ssl_mode,
            } => {
                let masked = if password.is_empty() { "" } else { "****" };
                tracing::info!("  SQLDB_DRIVER   : postgres");
                tracing::info!("  SQLDB_HOST     : {}", host);
                tracing::info!("  SQLDB_USER     : {}", user);
                tracing::info!("  SQLDB_NAME     : {}", name);
                tracing::info!("  SQLDB_PASSWORD : {}", masked);
                tracing::info!("  SQLDB_SSLMODE  : {}", ssl_mode);
            }
            DatabaseConfig::Sqlite { url } => {
                tracing::info!("  SQLDB_DRIVER   : sqlite");
                tracing::info!("  SQLITE_URL     : {}", url);
            }
        }
    }
}

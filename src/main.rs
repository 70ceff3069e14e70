//! Application entry point for the `air-quality-context` service.
//!
//! This binary orchestrates the full startup sequence for the NGSI-LD
//! `AirQualityObserved` context source, including:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Connecting to the database and creating the schema if needed
//! - Registering the context source and mounting the `routes` gateway
//! - Binding the Axum HTTP server and serving requests
//!
//! # Environment Variables
//! - `SQLDB_HOST`, `SQLDB_USER`, `SQLDB_NAME` (**required** for PostgreSQL)
//! - `SQLDB_PASSWORD`, `SQLDB_SSLMODE`, `SQLDB_DRIVER`, `SQLITE_URL` (optional)
//! - `SERVICE_PORT` (optional) – listening port (default: 8080)
//! - `DB_POOL_MAX` (optional) – maximum number of DB connections (default: 5)
//! - `AXUM_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `AXUM_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! A database that cannot be reached at startup is fatal: the process exits
//! with an error instead of serving in a degraded mode.
use std::{env, net::SocketAddr, sync::Arc};

use axum::Router;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use anyhow::{anyhow, Result};

mod config;
mod context;
mod error;
mod ngsi;
mod routes;
mod schema;
mod store;

pub use config::{Config, DatabaseConfig};

use context::AirQualitySource;
use ngsi::ContextRegistry;
use routes::AppContext;
use store::{Datastore, PgStore, SqliteStore};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    init_tracing();
    dotenv().ok();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let store = connect_store(&cfg).await?;

    let mut registry = ContextRegistry::new();
    registry.register(Arc::new(AirQualitySource::new(store)));

    // Build app from routes gateway (EMBP)
    let app: Router = routes::router(AppContext::new(registry));

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---

/// Open the configured datastore; the schema is created on construction.
async fn connect_store(cfg: &Config) -> Result<Arc<dyn Datastore>> {
    // ---
    match &cfg.database {
        DatabaseConfig::Postgres { host, name, .. } => {
            let options = cfg
                .database
                .pg_connect_options()?
                .ok_or_else(|| anyhow!("PostgreSQL connect options missing"))?;

            tracing::info!(%host, database = %name, "Attempting to connect to database");

            let pool = PgPoolOptions::new()
                .max_connections(cfg.db_pool_max)
                .connect_with(options)
                .await
                .map_err(|e| anyhow!("Failed to connect to database '{}' on '{}': {}", name, host, e))?;

            tracing::info!("Successfully connected to database");
            Ok(Arc::new(PgStore::new(pool).await?))
        }
        DatabaseConfig::Sqlite { url } => {
            tracing::info!(%url, "Opening SQLite database");
            Ok(Arc::new(SqliteStore::connect(url).await?))
        }
    }
}

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `AXUM_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by `RUST_LOG`, or else the `AXUM_LOG_LEVEL` env var
///
/// This should be called once at application startup before any logging
/// or tracing macros are invoked. It installs the subscriber globally
/// for the lifetime of the process.
fn init_tracing() {
    // ---
    let span_events = match env::var("AXUM_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // Determine if we should use colors
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to AXUM_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("AXUM_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn,tower_http=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}

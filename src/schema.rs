//! Database schema management for `air-quality-context`.
//!
//! Ensures the observation table and its index exist before serving
//! requests. Applied once when a store is constructed.

use anyhow::Result;
use sqlx::{PgPool, SqlitePool};

// ---

/// Create the PostgreSQL schema (idempotent).
///
/// Safe to call on every startup; no-op if objects already exist.
/// Errors are propagated if any SQL execution fails.
pub async fn create_pg_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS air_quality_observed (
            id          BIGSERIAL PRIMARY KEY,
            entity_id   TEXT             NOT NULL,
            device_id   TEXT             NOT NULL DEFAULT '',
            co2         DOUBLE PRECISION NOT NULL DEFAULT 0.0,
            humidity    DOUBLE PRECISION NOT NULL DEFAULT 0.0,
            temperature DOUBLE PRECISION NOT NULL DEFAULT 0.0,
            latitude    DOUBLE PRECISION NOT NULL DEFAULT 0.0,
            longitude   DOUBLE PRECISION NOT NULL DEFAULT 0.0,
            observed_at TIMESTAMPTZ      NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Device + time range is the only query shape we serve
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_air_quality_observed_device_time
            ON air_quality_observed (device_id, observed_at DESC);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Create the SQLite schema (idempotent).
pub async fn create_sqlite_schema(pool: &SqlitePool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS air_quality_observed (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            entity_id   TEXT     NOT NULL,
            device_id   TEXT     NOT NULL DEFAULT '',
            co2         REAL     NOT NULL DEFAULT 0.0,
            humidity    REAL     NOT NULL DEFAULT 0.0,
            temperature REAL     NOT NULL DEFAULT 0.0,
            latitude    REAL     NOT NULL DEFAULT 0.0,
            longitude   REAL     NOT NULL DEFAULT 0.0,
            observed_at DATETIME NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_air_quality_observed_device_time
            ON air_quality_observed (device_id, observed_at DESC);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

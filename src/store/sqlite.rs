use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Sqlite, SqlitePool};
use tracing::debug;

use super::{observation_query, Datastore, Observation, ObservationFilter, StoreResult};
use crate::schema;

// ---

/// SQLite-backed [`Datastore`], used for local runs and tests.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    // ---
    /// Open the database at `url` and create the schema if needed.
    ///
    /// Every connection to `sqlite::memory:` gets a private database, so the
    /// pool is pinned to a single connection that is never recycled.
    pub async fn connect(url: &str) -> anyhow::Result<Self> {
        // ---
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(url)
            .await?;

        schema::create_sqlite_schema(&pool).await?;
        Ok(Self { pool })
    }

    /// In-memory store, empty on creation.
    #[cfg(test)]
    pub async fn in_memory() -> anyhow::Result<Self> {
        Self::connect("sqlite::memory:").await
    }
}

#[async_trait]
impl Datastore for SqliteStore {
    // ---
    async fn create(
        &self,
        entity_id: &str,
        device_id: &str,
        co2: f64,
        humidity: f64,
        temperature: f64,
        observed_at: DateTime<Utc>,
    ) -> StoreResult<Observation> {
        // ---
        let row = sqlx::query_as::<_, Observation>(
            r#"
            INSERT INTO air_quality_observed (
                entity_id, device_id, co2, humidity, temperature, observed_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            RETURNING id, entity_id, device_id, co2, humidity, temperature,
                      latitude, longitude, observed_at
            "#,
        )
        .bind(entity_id)
        .bind(device_id)
        .bind(co2)
        .bind(humidity)
        .bind(temperature)
        .bind(observed_at)
        .fetch_one(&self.pool)
        .await?;

        debug!(id = row.id, entity_id, device_id, "Stored observation");
        Ok(row)
    }

    async fn query(&self, filter: &ObservationFilter) -> StoreResult<Vec<Observation>> {
        // ---
        let mut qb = observation_query::<Sqlite>(filter);
        let rows = qb
            .build_query_as::<Observation>()
            .fetch_all(&self.pool)
            .await?;

        debug!(?filter, count = rows.len(), "Queried observations");
        Ok(rows)
    }
}

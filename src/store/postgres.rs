use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use tracing::debug;

use super::{observation_query, Datastore, Observation, ObservationFilter, StoreResult};
use crate::schema;

// ---

/// PostgreSQL-backed [`Datastore`].
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    // ---
    /// Wrap `pool`, creating the schema if it does not exist yet.
    pub async fn new(pool: PgPool) -> anyhow::Result<Self> {
        // ---
        schema::create_pg_schema(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Datastore for PgStore {
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
            ) VALUES ($1, $2, $3, $4, $5, $6)
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
        let mut qb = observation_query::<Postgres>(filter);
        let rows = qb
            .build_query_as::<Observation>()
            .fetch_all(&self.pool)
            .await?;

        debug!(?filter, count = rows.len(), "Queried observations");
        Ok(rows)
    }
}

//! Row store for `AirQualityObserved` observations.
//!
//! The [`Datastore`] trait is the only thing the rest of the service sees;
//! `postgres` backs production and `sqlite` backs local runs and tests.
//! Both share the SELECT built by [`observation_query`], so temporal and
//! device filtering behave identically on either backend.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Database, Encode, QueryBuilder, Type};
use thiserror::Error;

mod postgres;
mod sqlite;

pub use postgres::PgStore;
pub use sqlite::SqliteStore;

// ---

/// A single persisted air quality observation.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct Observation {
    // ---
    pub id: i64,
    pub entity_id: String,
    pub device_id: String,
    pub co2: f64,
    pub humidity: f64,
    pub temperature: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub observed_at: DateTime<Utc>,
}

/// Filter for [`Datastore::query`].
///
/// An empty `device_id` and `None` bounds mean "no restriction". The time
/// range is half-open: `from` is inclusive, `to` is exclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationFilter {
    // ---
    pub device_id: String,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: u64,
}

#[derive(Debug, Error)]
#[error("datastore error: {0}")]
pub struct StoreError(#[from] sqlx::Error);

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence operations needed by the context source.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Datastore: Send + Sync {
    // ---
    /// Insert a new observation and return it with its assigned id.
    async fn create(
        &self,
        entity_id: &str,
        device_id: &str,
        co2: f64,
        humidity: f64,
        temperature: f64,
        observed_at: DateTime<Utc>,
    ) -> StoreResult<Observation>;

    /// Fetch observations matching `filter`, most recent first.
    async fn query(&self, filter: &ObservationFilter) -> StoreResult<Vec<Observation>>;
}

// ---

const SELECT_OBSERVATIONS: &str = "SELECT id, entity_id, device_id, co2, humidity, temperature, \
     latitude, longitude, observed_at FROM air_quality_observed";

/// Build the parameterised SELECT for `filter` on any sqlx backend.
fn observation_query<DB>(filter: &ObservationFilter) -> QueryBuilder<'static, DB>
where
    DB: Database,
    DB::Arguments<'static>: Default,
    String: Encode<'static, DB> + Type<DB> + Send,
    DateTime<Utc>: Encode<'static, DB> + Type<DB> + Send,
    i64: Encode<'static, DB> + Type<DB> + Send,
{
    // ---
    let mut qb = QueryBuilder::new(SELECT_OBSERVATIONS);
    let mut keyword = " WHERE ";

    if !filter.device_id.is_empty() {
        qb.push(keyword)
            .push("device_id = ")
            .push_bind(filter.device_id.clone());
        keyword = " AND ";
    }

    if let Some(from) = filter.from {
        qb.push(keyword).push("observed_at >= ").push_bind(from);
        keyword = " AND ";
    }

    if let Some(to) = filter.to {
        qb.push(keyword).push("observed_at < ").push_bind(to);
    }

    // LIMIT takes a signed integer on both backends
    let limit = i64::try_from(filter.limit).unwrap_or(i64::MAX);
    qb.push(" ORDER BY observed_at DESC LIMIT ").push_bind(limit);

    qb
}

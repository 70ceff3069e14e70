//! `AirQualityObserved` context source.
//!
//! Translates between NGSI-LD entities and stored [`Observation`] rows:
//! - create: decode the entity, strip the URN prefixes, default missing
//!   measurements to `0.0` and store exactly one row
//! - query: derive an [`ObservationFilter`] from the NGSI-LD query and emit
//!   one entity per row, in store order
//!
//! Retrieval by id and attribute updates are not offered.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info};

use crate::error::{ContextError, ContextResult};
use crate::ngsi::fiware::{
    AirQualityObserved, AIR_QUALITY_OBSERVED_ID_PREFIX, AIR_QUALITY_OBSERVED_TYPE,
    DEVICE_ID_PREFIX,
};
use crate::ngsi::types::parse_rfc3339;
use crate::ngsi::{ContextSource, Entity, EntityCallback, EntityRequest, Query};
use crate::store::{Datastore, Observation, ObservationFilter};

// ---

/// Attribute name under which this source is discoverable.
pub const AIR_QUALITY_ATTRIBUTE: &str = "airquality";

pub struct AirQualitySource {
    store: Arc<dyn Datastore>,
}

impl AirQualitySource {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self { store }
    }
}

/// Filter for the store derived from an NGSI-LD query.
pub fn observation_filter(query: &Query) -> ObservationFilter {
    // ---
    let device_id = query
        .device()
        .map(|d| strip_prefix(d, DEVICE_ID_PREFIX).to_string())
        .unwrap_or_default();

    let (from, to) = query
        .temporal()
        .map(|t| t.time_span())
        .unwrap_or((None, None));

    ObservationFilter {
        device_id,
        from,
        to,
        limit: query.pagination_limit(),
    }
}

/// NGSI-LD entity for a stored row.
pub fn to_entity(row: &Observation) -> AirQualityObserved {
    // ---
    let observed_at = row.observed_at.to_rfc3339_opts(SecondsFormat::Secs, true);

    let entity = AirQualityObserved::new(&row.entity_id, row.latitude, row.longitude, observed_at)
        .with_co2(row.co2)
        .with_relative_humidity(row.humidity)
        .with_temperature(row.temperature);

    if row.device_id.is_empty() {
        entity
    } else {
        entity.with_ref_device(&row.device_id)
    }
}

fn strip_prefix<'a>(id: &'a str, prefix: &str) -> &'a str {
    id.strip_prefix(prefix).unwrap_or(id)
}

fn parse_date_observed(value: &str) -> ContextResult<DateTime<Utc>> {
    parse_rfc3339(value).map_err(|source| ContextError::TimestampParse {
        value: value.to_string(),
        source,
    })
}

#[async_trait]
impl ContextSource for AirQualitySource {
    // ---
    fn supports_type(&self, type_name: &str) -> bool {
        type_name == AIR_QUALITY_OBSERVED_TYPE
    }

    fn matches_id(&self, entity_id: &str) -> bool {
        entity_id.starts_with(AIR_QUALITY_OBSERVED_ID_PREFIX)
    }

    fn supports_attribute(&self, attribute: &str) -> bool {
        attribute == AIR_QUALITY_ATTRIBUTE
    }

    async fn create(
        &self,
        type_name: &str,
        entity_id: &str,
        request: &EntityRequest,
    ) -> ContextResult<()> {
        // ---
        if type_name != AIR_QUALITY_OBSERVED_TYPE {
            return Err(ContextError::UnsupportedType(type_name.to_string()));
        }

        let aqo: AirQualityObserved = request.decode()?;
        let observed_at = parse_date_observed(&aqo.date_observed.value.value)?;

        let entity = strip_prefix(&aqo.id, AIR_QUALITY_OBSERVED_ID_PREFIX);
        let device = aqo
            .ref_device
            .as_ref()
            .map(|r| strip_prefix(&r.object, DEVICE_ID_PREFIX))
            .unwrap_or_default();

        let co2 = aqo.co2.map(|p| p.value).unwrap_or(0.0);
        let humidity = aqo.relative_humidity.map(|p| p.value).unwrap_or(0.0);
        let temperature = aqo.temperature.map(|p| p.value).unwrap_or(0.0);

        debug!(entity_id, %observed_at, "Creating AirQualityObserved");

        let row = self
            .store
            .create(entity, device, co2, humidity, temperature, observed_at)
            .await?;

        info!(id = row.id, entity_id = %row.entity_id, device_id = %row.device_id, "Observation stored");
        Ok(())
    }

    async fn query(&self, query: &Query, callback: &mut EntityCallback<'_>) -> ContextResult<()> {
        // ---
        let filter = observation_filter(query);
        let rows = self.store.query(&filter).await?;

        debug!(count = rows.len(), "Emitting AirQualityObserved entities");

        for row in &rows {
            let entity = serde_json::to_value(to_entity(row)).map_err(ContextError::Encode)?;
            callback(entity)?;
        }

        Ok(())
    }

    async fn retrieve_by_id(&self, _entity_id: &str) -> ContextResult<Entity> {
        Err(ContextError::NotSupported("retrieving AirQualityObserved by id"))
    }

    async fn update(&self, _entity_id: &str, _request: &EntityRequest) -> ContextResult<()> {
        Err(ContextError::NotSupported("updating AirQualityObserved attributes"))
    }
}

//! FIWARE `AirQualityObserved` data model.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{DateTimeProperty, GeoProperty, NumberProperty, Relationship};

// ---

pub const AIR_QUALITY_OBSERVED_TYPE: &str = "AirQualityObserved";
pub const AIR_QUALITY_OBSERVED_ID_PREFIX: &str = "urn:ngsi-ld:AirQualityObserved:";
pub const DEVICE_ID_PREFIX: &str = "urn:ngsi-ld:Device:";

/// JSON-LD contexts attached to every entity we emit.
pub const DEFAULT_CONTEXT: [&str; 2] = [
    "https://schema.lab.fiware.org/ld/context",
    "https://uri.etsi.org/ngsi-ld/v1/ngsi-ld-core-context.jsonld",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirQualityObserved {
    // ---
    pub id: String,

    #[serde(rename = "type")]
    pub entity_type: String,

    #[serde(rename = "dateObserved")]
    pub date_observed: DateTimeProperty,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoProperty>,

    #[serde(rename = "refDevice", default, skip_serializing_if = "Option::is_none")]
    pub ref_device: Option<Relationship>,

    #[serde(rename = "CO2", default, skip_serializing_if = "Option::is_none")]
    pub co2: Option<NumberProperty>,

    #[serde(rename = "relativeHumidity", default, skip_serializing_if = "Option::is_none")]
    pub relative_humidity: Option<NumberProperty>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<NumberProperty>,

    #[serde(rename = "@context", default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl AirQualityObserved {
    // ---
    /// New entity for the bare id `id`; the URN prefix is added here.
    pub fn new(id: &str, latitude: f64, longitude: f64, observed_at: impl Into<String>) -> Self {
        // ---
        Self {
            id: format!("{AIR_QUALITY_OBSERVED_ID_PREFIX}{id}"),
            entity_type: AIR_QUALITY_OBSERVED_TYPE.to_string(),
            date_observed: DateTimeProperty::new(observed_at),
            location: Some(GeoProperty::point(latitude, longitude)),
            ref_device: None,
            co2: None,
            relative_humidity: None,
            temperature: None,
            context: Some(serde_json::json!(DEFAULT_CONTEXT)),
        }
    }

    pub fn with_co2(mut self, co2: f64) -> Self {
        self.co2 = Some(NumberProperty::new(co2));
        self
    }

    pub fn with_relative_humidity(mut self, humidity: f64) -> Self {
        self.relative_humidity = Some(NumberProperty::new(humidity));
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(NumberProperty::new(temperature));
        self
    }

    /// Reference the device with bare id `device_id`.
    pub fn with_ref_device(mut self, device_id: &str) -> Self {
        self.ref_device = Some(Relationship::new(format!("{DEVICE_ID_PREFIX}{device_id}")));
        self
    }
}

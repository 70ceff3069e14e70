//! NGSI-LD property and relationship shapes used by the data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ---

fn property() -> String {
    "Property".to_string()
}

fn relationship() -> String {
    "Relationship".to_string()
}

fn geo_property() -> String {
    "GeoProperty".to_string()
}

fn date_time() -> String {
    "DateTime".to_string()
}

/// A numeric `Property`, e.g. `{"type": "Property", "value": 12.2}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberProperty {
    // ---
    #[serde(rename = "type", default = "property")]
    pub kind: String,
    pub value: f64,
    #[serde(rename = "unitCode", default, skip_serializing_if = "Option::is_none")]
    pub unit_code: Option<String>,
}

impl NumberProperty {
    pub fn new(value: f64) -> Self {
        Self {
            kind: property(),
            value,
            unit_code: None,
        }
    }
}

/// A typed JSON-LD literal, `{"@type": "DateTime", "@value": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateTimeValue {
    // ---
    #[serde(rename = "@type", default = "date_time")]
    pub kind: String,
    #[serde(rename = "@value")]
    pub value: String,
}

/// A `Property` whose value is a [`DateTimeValue`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateTimeProperty {
    // ---
    #[serde(rename = "type", default = "property")]
    pub kind: String,
    pub value: DateTimeValue,
}

impl DateTimeProperty {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            kind: property(),
            value: DateTimeValue {
                kind: date_time(),
                value: value.into(),
            },
        }
    }
}

/// A `Relationship` pointing at a single other entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    // ---
    #[serde(rename = "type", default = "relationship")]
    pub kind: String,
    pub object: String,
}

impl Relationship {
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            kind: relationship(),
            object: object.into(),
        }
    }
}

/// GeoJSON geometry. Coordinates are kept untyped so any geometry decodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Value,
}

/// A `GeoProperty` wrapping a GeoJSON geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoProperty {
    // ---
    #[serde(rename = "type", default = "geo_property")]
    pub kind: String,
    pub value: Geometry,
}

impl GeoProperty {
    /// Point location; GeoJSON orders coordinates longitude first.
    pub fn point(latitude: f64, longitude: f64) -> Self {
        Self {
            kind: geo_property(),
            value: Geometry {
                kind: "Point".to_string(),
                coordinates: serde_json::json!([longitude, latitude]),
            },
        }
    }
}

/// Why a timestamp is not strict RFC3339.
#[derive(Debug, Error)]
pub enum TimestampError {
    // ---
    #[error("date and time must be separated by 'T'")]
    Separator,

    #[error("UTC designator must be 'Z'")]
    UtcDesignator,

    #[error(transparent)]
    Format(#[from] chrono::ParseError),
}

/// Parse an RFC3339 timestamp, normalised to UTC.
///
/// chrono also takes a space or `t` between date and time and a lower-case
/// `z`; those are rejected here so only `YYYY-MM-DDTHH:MM:SS[.f](Z|±hh:mm)`
/// is accepted.
pub fn parse_rfc3339(value: &str) -> Result<DateTime<Utc>, TimestampError> {
    // ---
    if value.len() > 10 && value.as_bytes()[10] != b'T' {
        return Err(TimestampError::Separator);
    }
    if value.ends_with('z') {
        return Err(TimestampError::UtcDesignator);
    }

    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use serde_json::json;

    #[test]
    fn test_point_is_longitude_first() {
        // ---
        let location = serde_json::to_value(GeoProperty::point(40.42, -3.71)).unwrap();

        assert_eq!(
            location,
            json!({"type": "GeoProperty", "value": {"type": "Point", "coordinates": [-3.71, 40.42]}})
        );
    }

    #[test]
    fn test_property_type_tags_are_optional_on_input() {
        // ---
        let date: DateTimeProperty =
            serde_json::from_value(json!({"value": {"@value": "2016-03-15T11:00:00Z"}})).unwrap();
        assert_eq!(date, DateTimeProperty::new("2016-03-15T11:00:00Z"));

        let number: NumberProperty =
            serde_json::from_value(json!({"value": 500, "unitCode": "GP"})).unwrap();
        assert_eq!(number.kind, "Property");
        assert_eq!(number.value, 500.0);
        assert_eq!(number.unit_code.as_deref(), Some("GP"));
    }

    #[test]
    fn test_rfc3339_is_strict() {
        // ---
        use chrono::TimeZone;

        let eleven = Utc.with_ymd_and_hms(2016, 3, 15, 11, 0, 0).unwrap();
        assert_eq!(parse_rfc3339("2016-03-15T11:00:00Z").unwrap(), eleven);
        assert_eq!(parse_rfc3339("2016-03-15T12:00:00+01:00").unwrap(), eleven);
        assert_eq!(
            parse_rfc3339("2016-03-15T11:00:00.250Z")
                .unwrap()
                .timestamp_subsec_millis(),
            250
        );

        assert!(matches!(
            parse_rfc3339("2016-03-15 11:00:00Z"),
            Err(TimestampError::Separator)
        ));
        assert!(matches!(
            parse_rfc3339("2016-03-15t11:00:00Z"),
            Err(TimestampError::Separator)
        ));
        assert!(matches!(
            parse_rfc3339("2016-03-15T11:00:00z"),
            Err(TimestampError::UtcDesignator)
        ));
        assert!(matches!(parse_rfc3339("yesterday"), Err(TimestampError::Format(_))));
        assert!(matches!(parse_rfc3339("2016-03-15"), Err(TimestampError::Format(_))));
    }
}

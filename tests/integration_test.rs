//! End-to-end checks against a running instance.
//!
//! Set `BASE_URL` (e.g. `http://localhost:8080`) to run them; without it
//! the tests return early.

use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct Property {
    value: f64,
}

#[derive(Debug, Deserialize)]
struct Relationship {
    object: String,
}

#[derive(Debug, Deserialize)]
struct AirQualityObserved {
    id: String,
    #[serde(rename = "type")]
    entity_type: String,
    #[serde(rename = "CO2")]
    co2: Property,
    #[serde(rename = "relativeHumidity")]
    relative_humidity: Property,
    temperature: Property,
    #[serde(rename = "refDevice")]
    ref_device: Option<Relationship>,
}

fn base_url() -> Option<String> {
    std::env::var("BASE_URL").ok()
}

/// Device id unique to this run so repeated runs do not see each other.
fn unique_device() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    format!("it-{nanos}")
}

#[tokio::test]
async fn health_endpoint_ok() -> Result<()> {
    // ---
    let Some(base) = base_url() else {
        eprintln!("BASE_URL not set, skipping");
        return Ok(());
    };

    let response = Client::new().get(format!("{base}/health")).send().await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn create_then_query_by_device() -> Result<()> {
    // ---
    let Some(base) = base_url() else {
        eprintln!("BASE_URL not set, skipping");
        return Ok(());
    };
    let client = Client::new();
    let device = unique_device();

    let entity = json!({
        "id": "urn:ngsi-ld:AirQualityObserved:X",
        "type": "AirQualityObserved",
        "dateObserved": {"value": {"@type": "DateTime", "@value": "2016-03-15T11:00:00Z"}},
        "CO2": {"type": "Property", "value": 500, "unitCode": "GP"},
        "relativeHumidity": {"type": "Property", "value": 0.54},
        "temperature": {"type": "Property", "value": 12.2},
        "refDevice": {"type": "Relationship", "object": format!("urn:ngsi-ld:Device:{device}")}
    });

    let response = client
        .post(format!("{base}/ngsi-ld/v1/entities"))
        .json(&entity)
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::CREATED);

    let q = format!(r#"refDevice=="urn:ngsi-ld:Device:{device}""#);
    let entities: Vec<AirQualityObserved> = client
        .get(format!("{base}/ngsi-ld/v1/entities"))
        .query(&[("type", "AirQualityObserved"), ("q", q.as_str())])
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(entities.len(), 1, "expected exactly one entity for {device}");
    let aqo = &entities[0];
    assert_eq!(aqo.id, "urn:ngsi-ld:AirQualityObserved:X");
    assert_eq!(aqo.entity_type, "AirQualityObserved");
    assert_eq!(aqo.co2.value, 500.0);
    assert_eq!(aqo.relative_humidity.value, 0.54);
    assert_eq!(aqo.temperature.value, 12.2);
    assert_eq!(
        aqo.ref_device.as_ref().map(|r| r.object.as_str()),
        Some(format!("urn:ngsi-ld:Device:{device}").as_str())
    );

    Ok(())
}

#[tokio::test]
async fn unsupported_type_is_rejected() -> Result<()> {
    // ---
    let Some(base) = base_url() else {
        eprintln!("BASE_URL not set, skipping");
        return Ok(());
    };

    let response = Client::new()
        .post(format!("{base}/ngsi-ld/v1/entities"))
        .json(&json!({
            "id": "urn:ngsi-ld:WeatherObserved:X",
            "type": "WeatherObserved",
            "dateObserved": {"value": {"@value": "2016-03-15T11:00:00Z"}}
        }))
        .send()
        .await?;

    assert!(response.status().is_client_error());
    Ok(())
}

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch},
    Router,
};
use serde::Deserialize;
use tracing::{debug, info};

use super::AppContext;
use crate::error::{ContextError, ContextResult};
use crate::ngsi::{self, Entity, EntityRequest, QueryParams};

// ---

const ENTITIES_PATH: &str = "/ngsi-ld/v1/entities";
const JSON_LD: &str = "application/ld+json";

pub fn router() -> Router<AppContext> {
    // ---
    Router::new()
        .route(ENTITIES_PATH, get(query_entities).post(create_entity))
        .route("/ngsi-ld/v1/entities/{id}", get(retrieve_entity))
        .route("/ngsi-ld/v1/entities/{id}/attrs", patch(update_entity_attributes))
}

/// The two members every entity body must carry to be dispatched.
#[derive(Debug, Deserialize)]
struct EntityHeader {
    id: String,
    #[serde(rename = "type")]
    entity_type: String,
}

async fn create_entity(State(ctx): State<AppContext>, body: Bytes) -> ContextResult<Response> {
    // ---
    let request = EntityRequest::new(body);
    let header: EntityHeader = request.decode()?;

    info!(id = %header.id, entity_type = %header.entity_type, "POST {ENTITIES_PATH}");

    let source = ctx
        .registry
        .source_for_type(&header.entity_type)
        .ok_or_else(|| ContextError::UnsupportedType(header.entity_type.clone()))?;

    source
        .create(&header.entity_type, &header.id, &request)
        .await?;

    let location = format!("{ENTITIES_PATH}/{}", header.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)]).into_response())
}

async fn query_entities(
    State(ctx): State<AppContext>,
    Query(params): Query<QueryParams>,
    headers: HeaderMap,
) -> ContextResult<Response> {
    // ---
    debug!(?params, "GET {ENTITIES_PATH}");
    let query = ngsi::Query::try_from(params)?;

    let mut entities: Vec<Entity> = Vec::new();
    for source in ctx.registry.sources_for_query(&query) {
        let mut collect = |entity: Entity| -> ContextResult<()> {
            entities.push(entity);
            Ok(())
        };
        source.query(&query, &mut collect).await?;
    }

    info!(count = entities.len(), "Returning entities");
    json_response(&headers, &entities)
}

async fn retrieve_entity(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ContextResult<Response> {
    // ---
    let source = ctx
        .registry
        .source_for_id(&id)
        .ok_or_else(|| ContextError::NotFound(id.clone()))?;

    let entity = source.retrieve_by_id(&id).await?;
    json_response(&headers, &entity)
}

async fn update_entity_attributes(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    body: Bytes,
) -> ContextResult<StatusCode> {
    // ---
    let source = ctx
        .registry
        .source_for_id(&id)
        .ok_or_else(|| ContextError::NotFound(id.clone()))?;

    source.update(&id, &EntityRequest::new(body)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Serialize `value`, labelled JSON-LD when the client asks for it.
fn json_response<T: serde::Serialize>(headers: &HeaderMap, value: &T) -> ContextResult<Response> {
    // ---
    let wants_json_ld = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|accept| accept.contains(JSON_LD));

    let content_type = if wants_json_ld {
        HeaderValue::from_static(JSON_LD)
    } else {
        HeaderValue::from_static("application/json")
    };

    let body = serde_json::to_vec(value).map_err(ContextError::Encode)?;
    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}

#[cfg(test)]
mod tests {
    // ---
    use std::sync::Arc;

    use super::*;
    use crate::context::AirQualitySource;
    use crate::ngsi::ContextRegistry;
    use crate::store::SqliteStore;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn app() -> Router {
        // ---
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        let mut registry = ContextRegistry::new();
        registry.register(Arc::new(AirQualitySource::new(store)));

        crate::routes::router(AppContext::new(registry))
    }

    fn aqo(id: &str, device: Option<&str>, observed_at: &str) -> Value {
        // ---
        let mut entity = json!({
            "id": format!("urn:ngsi-ld:AirQualityObserved:{id}"),
            "type": "AirQualityObserved",
            "dateObserved": {"value": {"@type": "DateTime", "@value": observed_at}},
            "CO2": {"type": "Property", "value": 500, "unitCode": "GP"},
            "relativeHumidity": {"type": "Property", "value": 0.54},
            "temperature": {"type": "Property", "value": 12.2}
        });
        if let Some(device) = device {
            entity["refDevice"] = json!({"type": "Relationship", "object": format!("urn:ngsi-ld:Device:{device}")});
        }
        entity
    }

    async fn post(app: &Router, body: &Value) -> Response {
        // ---
        let request = Request::post(ENTITIES_PATH)
            .header(header::CONTENT_TYPE, JSON_LD)
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        // ---
        let request = Request::get(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn by_device(device: &str) -> String {
        format!(
            "{ENTITIES_PATH}?type=AirQualityObserved&q=refDevice==%22urn:ngsi-ld:Device:{device}%22"
        )
    }

    fn observed(entities: &Value) -> Vec<&str> {
        entities
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["dateObserved"]["value"]["@value"].as_str().unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_create_then_query_by_device() {
        // ---
        let app = app().await;

        let response = post(&app, &aqo("X", Some("D1"), "2016-03-15T11:00:00Z")).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/ngsi-ld/v1/entities/urn:ngsi-ld:AirQualityObserved:X"
        );

        let (status, entities) = get_json(&app, &by_device("D1")).await;
        assert_eq!(status, StatusCode::OK);

        let entities = entities.as_array().unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0]["id"], "urn:ngsi-ld:AirQualityObserved:X");
        assert_eq!(entities[0]["temperature"]["value"], 12.2);
        assert_eq!(entities[0]["CO2"]["value"], 500.0);
        assert_eq!(entities[0]["relativeHumidity"]["value"], 0.54);
        assert_eq!(entities[0]["refDevice"]["object"], "urn:ngsi-ld:Device:D1");
    }

    #[tokio::test]
    async fn test_missing_measurements_are_stored_as_zero() {
        // ---
        let app = app().await;
        let body = json!({
            "id": "urn:ngsi-ld:AirQualityObserved:Y",
            "type": "AirQualityObserved",
            "dateObserved": {"value": {"@value": "2016-03-15T11:00:00Z"}}
        });

        assert_eq!(post(&app, &body).await.status(), StatusCode::CREATED);

        let (_, entities) = get_json(&app, &format!("{ENTITIES_PATH}?type=AirQualityObserved")).await;
        let entity = &entities[0];
        assert_eq!(entity["CO2"]["value"], 0.0);
        assert_eq!(entity["relativeHumidity"]["value"], 0.0);
        assert_eq!(entity["temperature"]["value"], 0.0);
        assert!(entity.get("refDevice").is_none());
    }

    #[tokio::test]
    async fn test_create_rejections() {
        // ---
        let app = app().await;

        let mut wrong_type = aqo("X", None, "2016-03-15T11:00:00Z");
        wrong_type["type"] = json!("WeatherObserved");
        assert_eq!(post(&app, &wrong_type).await.status(), StatusCode::BAD_REQUEST);

        let bad_date = aqo("X", None, "15/03/2016");
        assert_eq!(post(&app, &bad_date).await.status(), StatusCode::BAD_REQUEST);

        let not_an_entity = json!(["AirQualityObserved"]);
        assert_eq!(post(&app, &not_an_entity).await.status(), StatusCode::BAD_REQUEST);

        // Nothing was stored
        let (_, entities) = get_json(&app, &format!("{ENTITIES_PATH}?type=AirQualityObserved")).await;
        assert_eq!(entities, json!([]));
    }

    #[tokio::test]
    async fn test_query_orders_newest_first_and_filters_device() {
        // ---
        let app = app().await;
        for time in ["2016-03-15T10:00:00Z", "2016-03-15T12:00:00Z", "2016-03-15T11:00:00Z"] {
            post(&app, &aqo("X", Some("D1"), time)).await;
        }
        post(&app, &aqo("Y", Some("D2"), "2016-03-15T11:30:00Z")).await;

        let (_, entities) = get_json(&app, &by_device("D1")).await;

        assert_eq!(
            observed(&entities),
            ["2016-03-15T12:00:00Z", "2016-03-15T11:00:00Z", "2016-03-15T10:00:00Z"]
        );
    }

    #[tokio::test]
    async fn test_temporal_query_excludes_end_time() {
        // ---
        let app = app().await;
        for time in ["2016-03-15T10:00:00Z", "2016-03-15T11:00:00Z", "2016-03-15T12:00:00Z"] {
            post(&app, &aqo("X", Some("D1"), time)).await;
        }

        let uri = format!(
            "{}&timerel=between&time=2016-03-15T10:00:00Z&endTime=2016-03-15T12:00:00Z",
            by_device("D1")
        );
        let (status, entities) = get_json(&app, &uri).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(observed(&entities), ["2016-03-15T11:00:00Z", "2016-03-15T10:00:00Z"]);
    }

    #[tokio::test]
    async fn test_query_limit() {
        // ---
        let app = app().await;
        for time in ["2016-03-15T10:00:00Z", "2016-03-15T11:00:00Z"] {
            post(&app, &aqo("X", Some("D1"), time)).await;
        }

        let (_, entities) = get_json(&app, &format!("{}&limit=1", by_device("D1"))).await;
        assert_eq!(observed(&entities), ["2016-03-15T11:00:00Z"]);

        let (_, entities) = get_json(&app, &format!("{}&limit=0", by_device("D1"))).await;
        assert_eq!(entities, json!([]));
    }

    #[tokio::test]
    async fn test_bad_queries_are_rejected() {
        // ---
        let app = app().await;

        let (status, problem) = get_json(&app, ENTITIES_PATH).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(problem["type"], "https://uri.etsi.org/ngsi-ld/errors/InvalidRequest");

        let (status, _) = get_json(
            &app,
            &format!("{ENTITIES_PATH}?type=AirQualityObserved&timerel=after&time=soon"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_json_ld_content_negotiation() {
        // ---
        let app = app().await;
        let request = Request::get(format!("{ENTITIES_PATH}?type=AirQualityObserved"))
            .header(header::ACCEPT, JSON_LD)
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], JSON_LD);
    }

    #[tokio::test]
    async fn test_retrieve_and_update_not_implemented() {
        // ---
        let app = app().await;

        let (status, _) =
            get_json(&app, "/ngsi-ld/v1/entities/urn:ngsi-ld:AirQualityObserved:X").await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);

        let (status, _) = get_json(&app, "/ngsi-ld/v1/entities/urn:ngsi-ld:Device:D1").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let request = Request::patch("/ngsi-ld/v1/entities/urn:ngsi-ld:AirQualityObserved:X/attrs")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"temperature": {"type": "Property", "value": 1.0}}"#))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn test_cors_mirrors_origin_with_credentials() {
        // ---
        let app = app().await;
        let request = Request::get("/health")
            .header(header::ORIGIN, "https://dashboard.example")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "https://dashboard.example");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }
}

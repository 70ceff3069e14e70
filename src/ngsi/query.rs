//! NGSI-LD entity query parameters.
//!
//! Parses the query string of `GET /ngsi-ld/v1/entities` into a [`Query`].
//! Only the parts this service acts on are modelled: entity types,
//! attributes, a `refDevice==` term in `q`, the temporal filter
//! (`timerel`, `time`, `endTime`) and the pagination limit.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use super::types::parse_rfc3339;
use crate::error::{ContextError, ContextResult};

// ---

/// Limit applied when the request does not carry one.
pub const DEFAULT_LIMIT: u64 = 1000;

const DEVICE_REFERENCE_TERM: &str = "refDevice==";

/// Raw query string parameters as they arrive over HTTP.
#[derive(Debug, Default, Deserialize)]
pub struct QueryParams {
    // ---
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
    pub attrs: Option<String>,
    pub q: Option<String>,
    pub georel: Option<String>,
    pub timerel: Option<String>,
    pub time: Option<String>,
    #[serde(rename = "endTime")]
    pub end_time: Option<String>,
    pub limit: Option<String>,
}

/// Time span of a temporal query. `None` leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TemporalQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl TemporalQuery {
    pub fn time_span(&self) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
        (self.from, self.to)
    }
}

/// A validated entity query.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    // ---
    entity_types: Vec<String>,
    attributes: Vec<String>,
    device: Option<String>,
    temporal: Option<TemporalQuery>,
    limit: u64,
}

impl Query {
    // ---
    pub fn entity_types(&self) -> &[String] {
        &self.entity_types
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// Device reference from a `refDevice=="..."` term, as given by the client.
    pub fn device(&self) -> Option<&str> {
        self.device.as_deref()
    }

    pub fn temporal(&self) -> Option<&TemporalQuery> {
        self.temporal.as_ref()
    }

    pub fn pagination_limit(&self) -> u64 {
        self.limit
    }
}

impl TryFrom<QueryParams> for Query {
    type Error = ContextError;

    fn try_from(params: QueryParams) -> ContextResult<Self> {
        // ---
        let entity_types = split_list(params.entity_type.as_deref());
        let attributes = split_list(params.attrs.as_deref());

        if entity_types.is_empty() && attributes.is_empty() {
            return Err(ContextError::BadRequest(
                "either type or attrs must be specified".to_string(),
            ));
        }

        if let Some(georel) = &params.georel {
            debug!(%georel, "Geo-queries are not supported, ignoring georel");
        }

        let device = params.q.as_deref().and_then(device_reference);

        let temporal = match params.timerel.as_deref() {
            None => None,
            Some(timerel) => Some(parse_temporal(
                timerel,
                params.time.as_deref(),
                params.end_time.as_deref(),
            )?),
        };

        let limit = match params.limit.as_deref() {
            None => DEFAULT_LIMIT,
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| ContextError::BadRequest(format!("invalid limit {raw:?}: {e}")))?,
        };

        Ok(Self {
            entity_types,
            attributes,
            device,
            temporal,
            limit,
        })
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

/// Extract the target of a `refDevice=="<id>"` term from `q`.
fn device_reference(q: &str) -> Option<String> {
    // ---
    q.split(';').find_map(|term| {
        term.trim()
            .strip_prefix(DEVICE_REFERENCE_TERM)
            .map(|value| value.trim().trim_matches('"').to_string())
    })
}

fn parse_temporal(
    timerel: &str,
    time: Option<&str>,
    end_time: Option<&str>,
) -> ContextResult<TemporalQuery> {
    // ---
    let time = parse_time("time", time)?;

    match timerel {
        "after" => Ok(TemporalQuery {
            from: Some(time),
            to: None,
        }),
        "before" => Ok(TemporalQuery {
            from: None,
            to: Some(time),
        }),
        "between" => Ok(TemporalQuery {
            from: Some(time),
            to: Some(parse_time("endTime", end_time)?),
        }),
        other => Err(ContextError::BadRequest(format!(
            "unsupported timerel {other:?}"
        ))),
    }
}

fn parse_time(name: &str, raw: Option<&str>) -> ContextResult<DateTime<Utc>> {
    // ---
    let raw = raw.ok_or_else(|| ContextError::BadRequest(format!("{name} is required")))?;
    parse_rfc3339(raw)
        .map_err(|e| ContextError::BadRequest(format!("invalid {name} {raw:?}: {e}")))
}

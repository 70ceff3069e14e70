//! Error taxonomy shared by the context source and the HTTP surface.
//!
//! Every failure is rendered as an NGSI-LD problem-details body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::ngsi::types::TimestampError;
use crate::store::StoreError;

// ---

#[derive(Debug, Error)]
pub enum ContextError {
    // ---
    #[error("entity type {0} not supported")]
    UnsupportedType(String),

    #[error("failed to decode request body: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to parse dateObserved {value:?}: {source}")]
    TimestampParse {
        value: String,
        #[source]
        source: TimestampError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to encode entity: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("no entity found with id {0}")]
    NotFound(String),

    #[error("{0} is not supported by this service")]
    NotSupported(&'static str),
}

pub type ContextResult<T> = Result<T, ContextError>;

/// NGSI-LD problem details (RFC 7807 shape).
#[derive(Debug, Serialize)]
struct ProblemDetails {
    #[serde(rename = "type")]
    problem_type: &'static str,
    title: &'static str,
    detail: String,
}

impl ContextError {
    // ---
    fn status_and_problem(&self) -> (StatusCode, &'static str, &'static str) {
        // ---
        match self {
            Self::UnsupportedType(_) | Self::Decode(_) | Self::TimestampParse { .. } => (
                StatusCode::BAD_REQUEST,
                "https://uri.etsi.org/ngsi-ld/errors/BadRequestData",
                "Bad request data",
            ),
            Self::BadRequest(_) => (
                StatusCode::BAD_REQUEST,
                "https://uri.etsi.org/ngsi-ld/errors/InvalidRequest",
                "Invalid request",
            ),
            Self::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "https://uri.etsi.org/ngsi-ld/errors/ResourceNotFound",
                "Resource not found",
            ),
            Self::NotSupported(_) => (
                StatusCode::NOT_IMPLEMENTED,
                "https://uri.etsi.org/ngsi-ld/errors/OperationNotSupported",
                "Operation not supported",
            ),
            Self::Store(_) | Self::Encode(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "https://uri.etsi.org/ngsi-ld/errors/InternalError",
                "Internal error",
            ),
        }
    }
}

impl IntoResponse for ContextError {
    fn into_response(self) -> Response {
        // ---
        let (status, problem_type, title) = self.status_and_problem();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }

        let body = ProblemDetails {
            problem_type,
            title,
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

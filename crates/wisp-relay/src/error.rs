//! Relay-wide error taxonomy. Every variant maps to a stable JSON shape and
//! status code — the relay never panics on malformed input.

use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation error: {field}: {reason}")]
    Validation { field: &'static str, reason: &'static str },
    #[error("rate limited")]
    RateLimited { retry_after_secs: u64 },
    #[error("store overloaded")]
    StoreOverloaded,
    #[error("internal error")]
    Internal,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, field) = match &self {
            ApiError::Validation { field, reason } => {
                (StatusCode::BAD_REQUEST, *reason, Some(*field))
            }
            ApiError::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "rate limited", None),
            ApiError::StoreOverloaded => {
                (StatusCode::SERVICE_UNAVAILABLE, "store overloaded", None)
            }
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal", None),
        };

        let mut response = (status, Json(ErrorBody { error, field })).into_response();
        if let ApiError::RateLimited { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert("Retry-After", value);
            }
        }
        response
    }
}

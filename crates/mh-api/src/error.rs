//! Domain error to HTTP status mapping.
//!
//! Every error body is `{"error": "<message>"}`. Internal failures are
//! logged with their full chain and surface as an opaque 500; upstream
//! provider outages surface as 502 so clients can tell them apart.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use mh_orders::OrderError;

#[derive(Debug)]
pub enum ApiError {
    /// Missing, malformed, or rejected bearer token.
    Unauthorized,
    /// The identity or mapping provider was unreachable.
    Upstream(anyhow::Error),
    Domain(OrderError),
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Domain(err)
    }
}

fn domain_status(err: &OrderError) -> StatusCode {
    match err {
        OrderError::InvalidInput(_)
        | OrderError::EmptyCart
        | OrderError::MultiRestaurantCart
        | OrderError::InvalidTransition { .. }
        | OrderError::InvalidState(_)
        | OrderError::InvalidCode => StatusCode::BAD_REQUEST,
        OrderError::NotFound(_) => StatusCode::NOT_FOUND,
        OrderError::Forbidden(_) => StatusCode::FORBIDDEN,
        OrderError::Conflict(_)
        | OrderError::CapacityExceeded { .. }
        | OrderError::InsufficientStock { .. }
        | OrderError::AlreadySubmitted => StatusCode::CONFLICT,
        OrderError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "missing or invalid bearer token".to_string(),
            ),
            ApiError::Upstream(err) => {
                error!(error = ?err, "upstream provider failure");
                (
                    StatusCode::BAD_GATEWAY,
                    "upstream provider unavailable".to_string(),
                )
            }
            ApiError::Domain(err) => {
                let status = domain_status(&err);
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    error!(error = ?err, "internal error");
                    (status, "internal error".to_string())
                } else {
                    (status, err.to_string())
                }
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

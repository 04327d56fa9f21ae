//! HTTP rendering of limiter errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::{error, warn};

use crate::error::TollgateError;

/// JSON body returned for failed requests.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Error code (e.g. "invalid_argument", "invalid_configuration").
    pub error: String,
    /// Human-readable error detail, omitted for internal errors.
    pub detail: Option<String>,
}

/// A [`TollgateError`] on its way out through the HTTP layer.
#[derive(Debug)]
pub struct ApiError(pub TollgateError);

impl From<TollgateError> for ApiError {
    fn from(err: TollgateError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, detail) = match &self.0 {
            TollgateError::InvalidArgument(msg) => {
                warn!(%msg, "Rejected invalid rate limit request");
                (StatusCode::BAD_REQUEST, "invalid_argument", Some(self.0.to_string()))
            }
            TollgateError::InvalidConfiguration(msg) => {
                error!(%msg, "Rate limiter is misconfigured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "invalid_configuration",
                    Some(self.0.to_string()),
                )
            }
            other => {
                error!(error = %other, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorBody {
            error: code.to_string(),
            detail,
        };

        (status, Json(body)).into_response()
    }
}

/**
 * Error Conversion
 *
 * This module turns an `ApiError` into an HTTP response. It is the single
 * place where handler failures are logged and mapped to a status, so
 * background units report through their channel instead of logging.
 *
 * # Response Format
 *
 * ```json
 * {
 *   "error": "Error message",
 *   "status": 400
 * }
 * ```
 */

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

use crate::backend::error::types::ApiError;

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            ApiError::Upstream { .. } => tracing::error!(status = status.as_u16(), "{}", self),
            ApiError::Cancelled | ApiError::RateLimited => {
                tracing::warn!(status = status.as_u16(), "{}", self)
            }
            _ => tracing::info!(status = status.as_u16(), "{}", self),
        }

        let body = serde_json::json!({
            "error": self.client_message(),
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}

/// Plain success body used by write endpoints
pub fn message_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "message": message }))).into_response()
}

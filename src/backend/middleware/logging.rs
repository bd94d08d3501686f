/**
 * Request Logging Middleware
 *
 * Logs each request on entry and exit inside a span carrying the client's
 * `X-REQUEST-ID`, the URI and the method, so every event a handler logs is
 * attributable to one request.
 */

use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use tracing::Instrument;

/// Header the client uses to tag its requests
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Client-supplied request ID, or `""` when absent
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Request logging middleware
pub async fn log_requests(request: Request, next: Next) -> Response {
    let span = tracing::info_span!(
        "request",
        id = request_id(request.headers()),
        uri = %request.uri(),
        method = %request.method(),
    );

    async move {
        tracing::info!("about to serve");
        let response = next.run(request).await;
        tracing::info!(status = response.status().as_u16(), "finished serving");
        response
    }
    .instrument(span)
    .await
}

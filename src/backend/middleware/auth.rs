/**
 * Session Guard
 *
 * This module provides the middleware that gates routes on the split
 * credential. It reads the `token-hp` and `token-s` cookies, verifies the
 * rejoined token and places the subject ID in the request extensions as
 * `Identity`.
 *
 * Two modes:
 *
 * - `require_session`: any missing or invalid credential is a 401.
 * - `optional_session`: a missing or invalid credential falls through to the
 *   handler without an `Identity`. Used on the login route so a client
 *   without a session can still log in.
 *
 * In both modes a verified request for `/api/login` is answered with 200
 * right away and never reaches the handler.
 */

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::backend::auth::cookies::read_credential;
use crate::backend::auth::sessions::TokenCodec;
use crate::backend::error::ApiError;
use crate::backend::server::state::AppState;

/// Path that a verified client is never let through to
pub const LOGIN_PATH: &str = "/api/login";

/// Verified subject ID of the current request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Identity(pub Uuid);

/// Required session guard
///
/// Returns 401 if either cookie is missing, or if the rejoined token is
/// malformed, expired, signed with another key or algorithm, or names
/// another issuer. The specific reason is logged.
pub async fn require_session(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user_id = authenticate(&app_state.codec, request.headers())?;

    if is_login_path(request.uri().path()) {
        tracing::info!(%user_id, "Login attempt with a valid session");
        return Ok(StatusCode::OK.into_response());
    }

    request.extensions_mut().insert(Identity(user_id));
    tracing::debug!(%user_id, "Session verified, serving next");

    Ok(next.run(request).await)
}

/// Optional session guard
pub async fn optional_session(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&app_state.codec, request.headers()) {
        Ok(user_id) => {
            if is_login_path(request.uri().path()) {
                tracing::info!(%user_id, "Login attempt with a valid session");
                return StatusCode::OK.into_response();
            }
            request.extensions_mut().insert(Identity(user_id));
        }
        Err(_) => tracing::debug!("No valid session, continuing anonymously"),
    }

    next.run(request).await
}

/// Verify the split credential carried in `headers`
pub fn authenticate(codec: &TokenCodec, headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let (client_part, opaque_part) = read_credential(headers).map_err(|e| {
        tracing::warn!("Rejected credential: {}", e);
        ApiError::unauthenticated(e.to_string())
    })?;

    codec.parse(&client_part, &opaque_part).map_err(|e| {
        tracing::warn!("Rejected token: {}", e);
        ApiError::unauthenticated(e.to_string())
    })
}

fn is_login_path(path: &str) -> bool {
    let trimmed = path.trim_end_matches('/');
    trimmed == LOGIN_PATH
}

/// Axum extractor for the verified user ID
///
/// Only routes behind `require_session` are guaranteed an `Identity`; the
/// extractor answers 401 where none was set.
#[derive(Clone, Copy, Debug)]
pub struct CurrentUser(pub Uuid);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .map(|identity| CurrentUser(identity.0))
            .ok_or_else(|| {
                tracing::warn!("Identity not found in request extensions");
                ApiError::unauthenticated("no verified identity")
            })
    }
}

/**
 * Login Handler
 *
 * This module implements the authentication handler for POST /api/login.
 *
 * The route sits behind the optional session guard: a client that already
 * holds a valid credential gets 200 from the guard and never reaches this
 * handler. Everyone else is checked by email and password.
 *
 * # Security
 *
 * - Unknown email and wrong password both return 401 with the same body
 * - bcrypt verification runs on the blocking pool
 */

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use uuid::Uuid;

use crate::backend::auth::cookies::set_credential;
use crate::backend::auth::handlers::types::LoginRequest;
use crate::backend::error::{message_response, ApiError};
use crate::backend::server::state::AppState;
use crate::backend::tasks::{run_unit, RequestScope};

/// Login handler
///
/// # Returns
///
/// 200 with `{"message": "logged in!"}` and fresh credential cookies.
///
/// # Errors
///
/// * `400 Bad Request` - Blank email or password
/// * `401 Unauthorized` - Unknown email or wrong password
/// * `408 Request Timeout` - Client gone or soft deadline passed
/// * `500 Internal Server Error` - Storage failure
pub async fn login(
    State(app_state): State<AppState>,
    scope: RequestScope,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;

    if request.email.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::input("invalid email and/or password"));
    }

    let store = app_state.store.clone();
    let email = request.email.clone();
    let user = run_unit(&scope, "user_by_email", move |_| async move {
        Ok::<_, ApiError>(store.user_by_email(&email).await?)
    })
    .await
    .map_err(|e| match e {
        ApiError::NotFound { .. } => invalid_credentials("unknown email"),
        other => other,
    })?;

    let hash = user.password_hash.clone();
    let matches = tokio::task::spawn_blocking(move || bcrypt::verify(request.password, &hash))
        .await
        .map_err(ApiError::upstream)?
        .map_err(|e| {
            tracing::error!("Failed to verify password hash: {:?}", e);
            ApiError::upstream(format!("bcrypt: {e}"))
        })?;

    if !matches {
        return Err(invalid_credentials("wrong password"));
    }

    tracing::info!(user_id = %user.id, "User logged in");
    session_response(&app_state, user.id, "logged in!")
}

fn invalid_credentials(detail: &str) -> ApiError {
    ApiError::unauthenticated(format!("login failed: {detail}"))
}

/// Issue a fresh split credential for `user_id` and answer 200
pub fn session_response(
    app_state: &AppState,
    user_id: Uuid,
    message: &str,
) -> Result<Response, ApiError> {
    let token = app_state.codec.issue(user_id).map_err(|e| {
        tracing::error!("Failed to issue session token: {}", e);
        ApiError::upstream(e)
    })?;

    let mut headers = HeaderMap::new();
    set_credential(&mut headers, &token, app_state.config.secure_cookies);

    Ok((headers, message_response(StatusCode::OK, message)).into_response())
}

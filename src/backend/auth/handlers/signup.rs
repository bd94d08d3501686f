/**
 * Signup Handler
 *
 * This module implements the account registration handler for
 * POST /api/signup.
 *
 * # Registration Process
 *
 * 1. Validate name, email and password (no storage call on failure)
 * 2. Check that the email and the name are free; a signup that loses a race
 *    past this check is still answered with the same 400 by the insert
 * 3. Hash the password with bcrypt at the configured cost
 * 4. Create the user with the default avatar
 * 5. Issue the split credential in two cookies
 *
 * Each storage step runs as a background unit raced against the request
 * scope. If the client is gone before the user is created, nothing is
 * written; if it disconnects after, the account exists but no session is
 * issued.
 */

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{Json, Response},
};
use chrono::Utc;
use uuid::Uuid;

use crate::backend::auth::handlers::login::session_response;
use crate::backend::auth::handlers::types::SignupRequest;
use crate::backend::error::ApiError;
use crate::backend::server::state::AppState;
use crate::backend::storage::{StoreError, UniqueField};
use crate::backend::tasks::{run_unit, RequestScope};
use crate::shared::validation::validate_signup;
use crate::shared::{User, DEFAULT_AVATAR};

/// Sign up handler
///
/// # Arguments
///
/// * `State(app_state)` - Application state (store, codec, config)
/// * `scope` - The request's cancellation scope
/// * `payload` - JSON body with `name`, `email` and `password`
///
/// # Returns
///
/// 200 with `{"message": "account created!"}` and the `token-hp` and
/// `token-s` cookies.
///
/// # Errors
///
/// * `400 Bad Request` - Invalid field, or email/name already taken
/// * `408 Request Timeout` - Client gone or soft deadline passed
/// * `500 Internal Server Error` - Storage or hashing failure
///
/// # Example Request
///
/// ```http
/// POST /api/signup HTTP/1.1
/// Content-Type: application/json
///
/// {"name": "User1", "email": "user1@example.com", "password": "Abcd1234!"}
/// ```
pub async fn signup(
    State(app_state): State<AppState>,
    scope: RequestScope,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    validate_signup(&request.name, &request.email, &request.password)?;

    let store = app_state.store.clone();
    let (name, email) = (request.name.clone(), request.email.clone());
    run_unit(&scope, "check_availability", move |_| async move {
        if store.email_taken(&email).await? {
            return Err(ApiError::from(StoreError::Duplicate(UniqueField::Email)));
        }
        if store.name_taken(&name).await? {
            return Err(ApiError::from(StoreError::Duplicate(UniqueField::Name)));
        }
        Ok::<_, ApiError>(())
    })
    .await?;

    let password_hash = hash_password(request.password, app_state.config.bcrypt_cost).await?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        name: request.name,
        email: request.email,
        password_hash,
        avatar: DEFAULT_AVATAR.to_string(),
        created: now,
        updated: now,
    };
    let user_id = user.id;

    let store = app_state.store.clone();
    run_unit(&scope, "create_user", move |scope| async move {
        scope.checkpoint()?;
        store.create_user(&user).await?;
        Ok::<_, ApiError>(())
    })
    .await?;

    tracing::info!(%user_id, "Account created");
    session_response(&app_state, user_id, "account created!")
}

/// Hash a password off the async executor
async fn hash_password(password: String, cost: u32) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(ApiError::upstream)?
        .map_err(|e| {
            tracing::error!("Failed to hash password: {:?}", e);
            ApiError::upstream(format!("bcrypt: {e}"))
        })
}

/**
 * User Handlers
 *
 * - GET /api/search?q=&prev= - name search, ten public profiles per page
 * - PUT /api/profilephoto/{userid} - avatar upload (session required)
 * - DELETE /api/profile/{userid} - account deletion (session required)
 *
 * The avatar upload is the one operation with two joint units: the file
 * write and the database update run concurrently and succeed only together.
 * A unit that fails trips the shared scope so the other stops at its next
 * checkpoint. Work already committed by the other unit is not rolled back.
 */

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{PathRejection, QueryRejection},
        Multipart, Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::backend::auth::cookies::expire_credential;
use crate::backend::error::{message_response, ApiError};
use crate::backend::middleware::CurrentUser;
use crate::backend::server::state::AppState;
use crate::backend::tasks::{run_unit, RequestScope, TaskRunner};
use crate::backend::users::assets::{
    avatar_file_name, remove_user_dir, sniff_image, store_avatar, MAX_AVATAR_BYTES,
};
use crate::shared::validation::{parse_cursor, parse_id, validate_search};
use crate::shared::{AvatarUpdate, UserSummary, PAGE_SIZE};

/// Query parameters for user search
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
    pub prev: Option<String>,
}

/// Search users by name
///
/// Matches names containing `q`, case-insensitively, created before `prev`
/// (RFC 3339; defaults to now), newest first. Pass the last hit's `created`
/// as `prev` to fetch the next page.
///
/// # Errors
///
/// * `400 Bad Request` - Missing or blank `q`, or malformed `prev`
/// * `408 Request Timeout` - Client gone or soft deadline passed
/// * `500 Internal Server Error` - Storage failure
pub async fn search_users(
    State(app_state): State<AppState>,
    scope: RequestScope,
    query: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<UserSummary>>, ApiError> {
    let Query(params) = query?;
    let fragment = validate_search(params.q.as_deref())?.to_string();
    let before = parse_cursor(params.prev.as_deref())?;

    let store = app_state.store.clone();
    let users = run_unit(&scope, "search_users", move |_| async move {
        Ok::<_, ApiError>(store.search_users(&fragment, before, PAGE_SIZE).await?)
    })
    .await?;

    Ok(Json(users))
}

/// Replace the current user's avatar
///
/// Expects a multipart form with one file field named `avatar`, at most
/// 1 MiB, whose leading bytes identify it as JPEG or PNG.
///
/// # Returns
///
/// The new avatar file name and update time.
///
/// # Errors
///
/// * `400 Bad Request` - Bad user ID, missing file, file too big or of another type
/// * `403 Forbidden` - `userid` is not the current user
/// * `408 Request Timeout` - Client gone or soft deadline passed
/// * `500 Internal Server Error` - File write or database update failed
pub async fn update_profile_photo(
    State(app_state): State<AppState>,
    CurrentUser(current_user): CurrentUser,
    scope: RequestScope,
    path: Result<Path<String>, PathRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AvatarUpdate>, ApiError> {
    let Path(raw_id) = path?;
    let user_id = authorize_self(current_user, &raw_id)?;

    let contents = read_avatar(multipart?).await?;
    let kind = sniff_image(&contents).ok_or_else(|| {
        tracing::warn!(%user_id, "Avatar upload of invalid file type");
        ApiError::input("avatar of invalid file type")
    })?;

    let update = AvatarUpdate {
        id: user_id,
        avatar: avatar_file_name(kind),
        updated: Utc::now(),
    };

    let mut runner = TaskRunner::new(&scope);

    let assets_dir = app_state.config.assets_dir.clone();
    let file_name = update.avatar.clone();
    runner.spawn("write_avatar", move |scope| async move {
        store_avatar(&assets_dir, user_id, &file_name, contents, &scope).await?;
        Ok::<_, ApiError>(())
    });

    let store = app_state.store.clone();
    let (avatar, updated) = (update.avatar.clone(), update.updated);
    runner.spawn("update_avatar", move |scope| async move {
        scope.checkpoint()?;
        store.update_user_avatar(user_id, &avatar, updated).await?;
        Ok::<_, ApiError>(())
    });

    runner.join().await?;

    tracing::info!(%user_id, avatar = %update.avatar, "Avatar updated");
    Ok(Json(update))
}

/// Delete the current user's account
///
/// Removes the avatar folder, then the user and their posts, then expires
/// both credential cookies.
///
/// # Errors
///
/// * `400 Bad Request` - Bad user ID
/// * `403 Forbidden` - `userid` is not the current user
/// * `408 Request Timeout` - Client gone or soft deadline passed
/// * `500 Internal Server Error` - Filesystem or storage failure
pub async fn delete_user(
    State(app_state): State<AppState>,
    CurrentUser(current_user): CurrentUser,
    scope: RequestScope,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(raw_id) = path?;
    let user_id = authorize_self(current_user, &raw_id)?;

    let store = app_state.store.clone();
    let assets_dir = app_state.config.assets_dir.clone();
    run_unit(&scope, "delete_account", move |scope| async move {
        scope.checkpoint()?;
        remove_user_dir(&assets_dir, user_id).await?;
        scope.checkpoint()?;
        store.delete_user(user_id).await?;
        Ok::<_, ApiError>(())
    })
    .await?;

    tracing::info!(%user_id, "Account deleted");

    let mut headers = HeaderMap::new();
    expire_credential(&mut headers);
    Ok((headers, message_response(StatusCode::OK, "account successfully deleted.")).into_response())
}

/// Parse `raw_id` and require it to be the current user
fn authorize_self(current_user: Uuid, raw_id: &str) -> Result<Uuid, ApiError> {
    let user_id = parse_id(raw_id, "userid")?;

    if user_id != current_user {
        tracing::warn!(%current_user, target = %user_id, "Forbidden request on another account");
        return Err(ApiError::forbidden("userid does not match the session"));
    }

    Ok(user_id)
}

/// Read the `avatar` field of the form
async fn read_avatar(mut multipart: Multipart) -> Result<Bytes, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        if field.name() != Some("avatar") {
            continue;
        }

        let contents = field.bytes().await.map_err(upload_error)?;
        if contents.len() > MAX_AVATAR_BYTES {
            return Err(too_big(format!("{} bytes", contents.len())));
        }
        return Ok(contents);
    }

    Err(ApiError::input("missing file"))
}

fn upload_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        too_big(err.body_text())
    } else {
        err.into()
    }
}

fn too_big(detail: String) -> ApiError {
    ApiError::InputInvalid {
        message: "file too big (>1MB)".to_string(),
        detail,
    }
}

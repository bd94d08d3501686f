/**
 * Post Handlers
 *
 * - GET /api/posts?prev= - ten posts per page, newest first
 * - POST /api/post - create a post as the current user
 * - PUT /api/post - edit one of the current user's posts
 * - DELETE /api/post/{postid} - delete one of the current user's posts
 *
 * Edits and deletes load the stored post and compare its author with the
 * session before writing. The author ID in the request body, if any, is
 * ignored.
 */

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{Json, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::error::{message_response, ApiError};
use crate::backend::middleware::CurrentUser;
use crate::backend::server::state::AppState;
use crate::backend::storage::{Datastore, NewPost};
use crate::backend::tasks::{run_unit, RequestScope};
use crate::shared::validation::{parse_cursor, parse_id, validate_post};
use crate::shared::{Post, PAGE_SIZE};

/// Query parameters for listings
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub prev: Option<String>,
}

/// Body of a new post
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct PostRequest {
    pub title: String,
    pub body: String,
}

/// Body of an edit
#[derive(Debug, Deserialize, Serialize)]
pub struct EditPostRequest {
    pub id: Uuid,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// List posts from all users
pub async fn all_posts(
    State(app_state): State<AppState>,
    scope: RequestScope,
    query: Result<Query<PageParams>, QueryRejection>,
) -> Result<Json<Vec<Post>>, ApiError> {
    let Query(params) = query?;
    let before = parse_cursor(params.prev.as_deref())?;

    let store = app_state.store.clone();
    let posts = run_unit(&scope, "all_posts", move |_| async move {
        Ok::<_, ApiError>(store.all_posts(before, PAGE_SIZE).await?)
    })
    .await?;

    Ok(Json(posts))
}

/// Create a post
///
/// # Errors
///
/// * `400 Bad Request` - Blank or over-long title or body
/// * `408 Request Timeout` - Client gone or soft deadline passed
/// * `500 Internal Server Error` - Storage failure
pub async fn create_post(
    State(app_state): State<AppState>,
    CurrentUser(current_user): CurrentUser,
    scope: RequestScope,
    payload: Result<Json<PostRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    validate_post(&request.title, &request.body)?;

    let post = NewPost {
        id: Uuid::new_v4(),
        author_id: current_user,
        title: request.title,
        body: request.body,
        created: Utc::now(),
    };
    let post_id = post.id;

    let store = app_state.store.clone();
    run_unit(&scope, "create_post", move |scope| async move {
        scope.checkpoint()?;
        store.create_post(&post).await?;
        Ok::<_, ApiError>(())
    })
    .await?;

    tracing::info!(%post_id, author = %current_user, "Post submitted");
    Ok(message_response(StatusCode::OK, "post submitted!"))
}

/// Edit a post
///
/// # Errors
///
/// * `400 Bad Request` - Blank or over-long title or body
/// * `403 Forbidden` - The post belongs to someone else
/// * `404 Not Found` - No such post
/// * `408 Request Timeout` - Client gone or soft deadline passed
/// * `500 Internal Server Error` - Storage failure
pub async fn edit_post(
    State(app_state): State<AppState>,
    CurrentUser(current_user): CurrentUser,
    scope: RequestScope,
    payload: Result<Json<EditPostRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    validate_post(&request.title, &request.body)?;

    let store = app_state.store.clone();
    let post_id = request.id;
    run_unit(&scope, "edit_post", move |scope| async move {
        require_author(store.as_ref(), post_id, current_user).await?;
        scope.checkpoint()?;
        store
            .update_post(post_id, &request.title, &request.body, Utc::now())
            .await?;
        Ok::<_, ApiError>(())
    })
    .await?;

    tracing::info!(%post_id, "Post edited");
    Ok(message_response(StatusCode::OK, "post edited!"))
}

/// Delete a post
///
/// # Errors
///
/// * `400 Bad Request` - `postid` is not a UUID
/// * `403 Forbidden` - The post belongs to someone else
/// * `404 Not Found` - No such post
/// * `408 Request Timeout` - Client gone or soft deadline passed
/// * `500 Internal Server Error` - Storage failure
pub async fn delete_post(
    State(app_state): State<AppState>,
    CurrentUser(current_user): CurrentUser,
    scope: RequestScope,
    path: Result<Path<String>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(raw_id) = path?;
    let post_id = parse_id(&raw_id, "postid")?;

    let store = app_state.store.clone();
    run_unit(&scope, "delete_post", move |scope| async move {
        require_author(store.as_ref(), post_id, current_user).await?;
        scope.checkpoint()?;
        store.delete_post(post_id).await?;
        Ok::<_, ApiError>(())
    })
    .await?;

    tracing::info!(%post_id, "Post deleted");
    Ok(message_response(StatusCode::OK, "post deleted!"))
}

/// Load a post and require `current_user` to be its author
async fn require_author(
    store: &dyn Datastore,
    post_id: Uuid,
    current_user: Uuid,
) -> Result<Post, ApiError> {
    let post = store.one_post(post_id).await?;

    if post.author.id != current_user {
        tracing::warn!(%post_id, %current_user, "Forbidden request on another user's post");
        return Err(ApiError::forbidden("post belongs to another user"));
    }

    Ok(post)
}

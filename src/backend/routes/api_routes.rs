/**
 * API Route Handlers
 *
 * This module wires the users and posts handlers to their paths and puts
 * the session guard in front of the ones that need it.
 *
 * # Routes
 *
 * ## Public
 * - `GET /api/search` - Search users
 * - `POST /api/signup` - Create an account
 * - `GET /api/posts` - List posts
 *
 * ## Optional session
 * - `POST /api/login` - Log in (a valid session short-circuits with 200)
 *
 * ## Session required
 * - `PUT /api/profilephoto/{userid}` - Upload avatar
 * - `DELETE /api/profile/{userid}` - Delete account
 * - `POST /api/post` - Create post
 * - `PUT /api/post` - Edit post
 * - `DELETE /api/post/{postid}` - Delete post
 */

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::backend::auth::{login, signup};
use crate::backend::middleware::{optional_session, require_session};
use crate::backend::posts::{all_posts, create_post, delete_post, edit_post};
use crate::backend::server::state::AppState;
use crate::backend::users::assets::MAX_AVATAR_BYTES;
use crate::backend::users::{delete_user, search_users, update_profile_photo};

/// Room for multipart boundaries and part headers around the avatar
const FORM_OVERHEAD_BYTES: usize = 16 * 1024;

/// Configure API routes
///
/// # Arguments
///
/// * `router` - The router to add routes to
/// * `app_state` - State handed to the session guard layers
///
/// # Returns
///
/// Router with API routes configured
pub fn configure_api_routes(router: Router<AppState>, app_state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route(
            "/api/profilephoto/{userid}",
            put(update_profile_photo)
                .layer(DefaultBodyLimit::max(MAX_AVATAR_BYTES + FORM_OVERHEAD_BYTES)),
        )
        .route("/api/profile/{userid}", delete(delete_user))
        .route("/api/post", post(create_post).put(edit_post))
        .route("/api/post/{postid}", delete(delete_post))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            require_session,
        ));

    let login_routes = Router::new()
        .route("/api/login", post(login))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            optional_session,
        ));

    router
        .route("/api/search", get(search_users))
        .route("/api/signup", post(signup))
        .route("/api/posts", get(all_posts))
        .merge(login_routes)
        .merge(protected)
}

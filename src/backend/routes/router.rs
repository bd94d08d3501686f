/**
 * Router Configuration
 *
 * This module assembles the API routes and the server-wide middleware stack
 * into a single Axum router.
 *
 * # Layer Order
 *
 * Outermost first:
 * 1. Rate limit - over-budget clients get 429 before anything else runs
 * 2. Hard timeout - cuts the request off with 408 no matter what
 * 3. CSRF - state-changing requests need a matching token; every response
 *    gets a fresh one
 * 4. Deadline - creates the request's cancellation scope (soft deadline)
 * 5. Request logging - entry/exit events with the client's request ID
 * 6. Routes, with the session guard as a route layer where required
 */

use axum::{middleware, Router};
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;

use crate::backend::error::ApiError;
use crate::backend::middleware::{
    csrf_middleware, deadline_middleware, log_requests, rate_limit_middleware,
};
use crate::backend::routes::api_routes::configure_api_routes;
use crate::backend::server::state::AppState;

/// Create the Axum router with all routes configured
///
/// # Arguments
///
/// * `app_state` - Application state (config, codec, store, limiter)
///
/// # Returns
///
/// Configured Axum Router ready to serve requests
pub fn create_router(app_state: AppState) -> Router<()> {
    let router = configure_api_routes(Router::new(), &app_state);

    let router = router.fallback(|| async { ApiError::not_found("no such route") });

    let layers = ServiceBuilder::new()
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            rate_limit_middleware,
        ))
        .layer(TimeoutLayer::new(app_state.config.hard_timeout))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            csrf_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            deadline_middleware,
        ))
        .layer(middleware::from_fn(log_requests));

    router.layer(layers).with_state(app_state)
}

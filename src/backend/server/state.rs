/**
 * Application State Management
 *
 * This module defines the application state structure and implements
 * the necessary `FromRef` traits for Axum state extraction.
 *
 * # Architecture
 *
 * The `AppState` struct is built once at startup and cloned into every
 * request. It holds:
 * - The validated `ServerConfig`
 * - The token codec shared by the session guard and the signup/login handlers
 * - The datastore as a trait object
 * - The per-client rate limiter
 *
 * # Thread Safety
 *
 * Every field is cheap to clone and safe to share:
 * - `Arc<ServerConfig>` and `Arc<dyn Datastore>` are shared read-only
 * - `TokenCodec` holds only keys and validation settings
 * - `RateLimiter` wraps an `Arc<DashMap<..>>` of buckets
 *
 * # Example
 *
 * ```rust,ignore
 * use axum::extract::State;
 * use snippets::backend::server::state::AppState;
 *
 * async fn handler(State(state): State<AppState>) {
 *     let posts = state.store.all_posts(chrono::Utc::now(), 10).await;
 * }
 * ```
 */

use std::sync::Arc;

use axum::extract::FromRef;

use crate::backend::auth::sessions::TokenCodec;
use crate::backend::middleware::rate_limit::RateLimiter;
use crate::backend::server::config::ServerConfig;
use crate::backend::storage::Datastore;

/// Application state shared by all handlers and middleware
///
/// # Fields
///
/// * `config` - Process configuration, loaded once
/// * `codec` - Issues and verifies split session tokens
/// * `store` - Users and posts persistence
/// * `limiter` - Per-client token buckets
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub codec: TokenCodec,
    pub store: Arc<dyn Datastore>,
    pub limiter: RateLimiter,
}

impl AppState {
    /// Build the state from a validated configuration and a datastore
    pub fn new(config: ServerConfig, store: Arc<dyn Datastore>) -> Self {
        let codec = TokenCodec::from_config(&config);
        let limiter = RateLimiter::from_config(&config);

        Self {
            config: Arc::new(config),
            codec,
            store,
            limiter,
        }
    }
}

/// Implement FromRef for the server configuration
impl FromRef<AppState> for Arc<ServerConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.config.clone()
    }
}

/// Implement FromRef for the token codec
///
/// This allows handlers to take `State(codec): State<TokenCodec>`.
impl FromRef<AppState> for TokenCodec {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.codec.clone()
    }
}

/// Implement FromRef for the datastore
impl FromRef<AppState> for Arc<dyn Datastore> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.store.clone()
    }
}

/// Implement FromRef for the rate limiter
impl FromRef<AppState> for RateLimiter {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.limiter.clone()
    }
}

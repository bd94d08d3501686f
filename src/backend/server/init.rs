/**
 * Server Initialization
 *
 * This module handles the initialization and setup of the Axum HTTP server,
 * including datastore loading, state creation and route configuration.
 *
 * # Initialization Process
 *
 * 1. Connect to PostgreSQL and run migrations
 * 2. Build the shared `AppState`
 * 3. Start the periodic rate limiter cleanup
 * 4. Create and configure the router
 */

use std::sync::Arc;

use axum::Router;
use thiserror::Error;

use crate::backend::routes::router::create_router;
use crate::backend::server::config::{load_database, ServerConfig};
use crate::backend::server::state::AppState;
use crate::backend::storage::PgStore;

/// Errors that stop the server from starting
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("DATABASE_URL must be set")]
    MissingDatabase,
    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),
}

/// Create and configure the Axum application
///
/// # Arguments
///
/// * `config` - Validated process configuration
///
/// # Returns
///
/// Configured Axum Router ready to serve requests
///
/// # Errors
///
/// Fails when no database URL is configured or the connection cannot be
/// established. Migration failures are only logged.
pub async fn create_app(config: ServerConfig) -> Result<Router<()>, StartupError> {
    tracing::info!("Initializing snippets backend server");

    // Step 1: Load the datastore
    let database_url = config
        .database_url
        .clone()
        .ok_or(StartupError::MissingDatabase)?;
    let pool = load_database(&database_url).await?;
    let store = Arc::new(PgStore::new(pool));

    // Step 2: Create app state
    let app_state = AppState::new(config, store);
    tracing::info!(
        rate_per_second = app_state.config.rate_per_second,
        soft_timeout_secs = app_state.config.soft_timeout.as_secs(),
        hard_timeout_secs = app_state.config.hard_timeout.as_secs(),
        "Application state initialized"
    );

    // Step 3: Start periodic cleanup of idle rate limit buckets
    app_state.limiter.spawn_cleanup();

    // Step 4: Create router with all routes
    let app = create_router(app_state);
    tracing::info!("Router configured with periodic cleanup task");

    Ok(app)
}

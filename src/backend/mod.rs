//! Backend Module
//!
//! This module contains all server-side code for the snippets API.
//!
//! # Architecture
//!
//! - **`server`** - Configuration, application state, initialization
//! - **`routes`** - Route table and server-wide layers
//! - **`middleware`** - Session guard, governor, CSRF check, request logging
//! - **`auth`** - Token codec, credential cookies, signup and login
//! - **`tasks`** - Request scopes and the cancellable task runner
//! - **`users`** - Search, avatar upload, account deletion
//! - **`posts`** - Post listing and authoring
//! - **`storage`** - `Datastore` trait with PostgreSQL and in-memory adapters
//! - **`error`** - `ApiError` and its HTTP mapping
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs          - Module exports and documentation
//! ├── server/         - Server initialization and state
//! ├── routes/         - Route configuration
//! ├── middleware/     - Request middleware
//! ├── auth/           - Sessions and credentials
//! ├── tasks/          - Cancellable task runner
//! ├── users/          - User handlers and avatar files
//! ├── posts/          - Post handlers
//! ├── storage/        - Persistence
//! └── error/          - Error types
//! ```
//!
//! # Request Flow
//!
//! 1. Rate limit check (429)
//! 2. Hard timeout (408)
//! 3. CSRF check on state-changing methods (403)
//! 4. Request scope with the soft deadline
//! 5. Request logging
//! 6. Session guard on protected routes (401)
//! 7. Handler, with work fanned out through `TaskRunner`

/// Server setup and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Middleware for request processing
pub mod middleware;

/// Authentication and session credentials
pub mod auth;

/// Cancellable task runner
pub mod tasks;

/// User management
pub mod users;

/// Posts
pub mod posts;

/// Persistence
pub mod storage;

/// Backend error types
pub mod error;

/// Re-export commonly used types
pub use error::ApiError;
pub use server::create_app;

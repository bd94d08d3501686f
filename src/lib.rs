//! Snippets - Main Library
//!
//! Snippets is a JSON REST backend for a small social posting site: users
//! sign up, log in, upload an avatar, and publish short posts.
//!
//! # Overview
//!
//! The library provides:
//! - A split-cookie session credential (signed token cut in two)
//! - A session guard that gates routes on that credential
//! - A cancellable task runner for handler work with all-or-nothing results
//! - A rate and timeout governor applied to every request
//! - Users and posts endpoints over a pluggable datastore
//!
//! # Module Structure
//!
//! - **`shared`** - Domain types, validation and shared error types
//!   - `User`, `PublicUser`, `UserSummary`, `Post`
//!   - Input validation and pagination cursors
//!
//! - **`backend`** - Server-side code
//!   - Axum router, middleware and handlers
//!   - Token codec and cookie handling
//!   - Task runner and request scopes
//!   - PostgreSQL and in-memory datastores
//!
//! # Usage
//!
//! ```rust,no_run
//! use snippets::backend::server::{create_app, ServerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let app = create_app(ServerConfig::from_env()?).await?;
//! // Serve with axum::serve
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! - `shared::SharedError` for validation failures
//! - `backend::error::ApiError` for everything a handler can return
//! - `backend::storage::StoreError` for datastore failures

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
pub mod backend;

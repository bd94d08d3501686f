//! Middleware Module
//!
//! This module contains all HTTP middleware for the backend server.
//!
//! # Architecture
//!
//! - **`auth`** - Session guard (required and optional) and the `CurrentUser` extractor
//! - **`rate_limit`** - Per-client token bucket
//! - **`csrf`** - Double-submit CSRF tokens for state-changing requests
//! - **`deadline`** - Per-request cancellation scope with the soft deadline
//! - **`logging`** - Request logging with the client's request ID
//!
//! # Layer Order
//!
//! Outermost first, as assembled in `routes::router`:
//!
//! ```text
//! rate_limit -> hard timeout -> csrf -> deadline -> logging -> routes
//! ```
//!
//! The session guard is a route layer on the routes that need it.

pub mod auth;
pub mod csrf;
pub mod deadline;
pub mod logging;
pub mod rate_limit;

pub use auth::{authenticate, optional_session, require_session, CurrentUser, Identity};
pub use csrf::csrf_middleware;
pub use deadline::deadline_middleware;
pub use logging::log_requests;
pub use rate_limit::{rate_limit_middleware, RateLimiter};

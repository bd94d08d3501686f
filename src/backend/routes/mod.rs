//! Route Configuration Module
//!
//! This module configures all HTTP routes for the backend server.
//!
//! # Module Structure
//!
//! ```text
//! routes/
//! ├── mod.rs          - Module exports and documentation
//! ├── router.rs       - Router creation and server-wide layers
//! └── api_routes.rs   - API endpoints and session guards
//! ```

/// Main router creation
pub mod router;

/// API route handlers
pub mod api_routes;

pub use router::create_router;

//! Backend Error Module
//!
//! This module defines the error type returned by handlers, middleware and
//! background units, and its conversion into HTTP responses.
//!
//! # Module Structure
//!
//! ```text
//! error/
//! ├── mod.rs        - Module exports and documentation
//! ├── types.rs      - ApiError and status mapping
//! └── conversion.rs - IntoResponse implementation
//! ```
//!
//! # HTTP Response Conversion
//!
//! `ApiError` implements `IntoResponse`, so handlers return
//! `Result<_, ApiError>` and let `?` do the mapping.

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

// Re-export commonly used types
pub use conversion::message_response;
pub use types::ApiError;

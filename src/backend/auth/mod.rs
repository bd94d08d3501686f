//! Authentication Module
//!
//! This module handles session issuance and verification.
//!
//! # Module Structure
//!
//! ```text
//! auth/
//! ├── mod.rs          - Module exports and documentation
//! ├── sessions.rs     - Token codec (issue, split, rejoin, verify)
//! ├── cookies.rs      - Credential cookie transport
//! └── handlers/       - HTTP handlers
//!     ├── mod.rs      - Handler exports
//!     ├── types.rs    - Request types
//!     ├── signup.rs   - Account registration handler
//!     └── login.rs    - Password login handler
//! ```
//!
//! # Authentication Flow
//!
//! 1. **Signup / Login**: credentials checked → token issued → split across
//!    `token-hp` and `token-s`
//! 2. **Guarded request**: both cookies read → token rejoined and verified →
//!    user ID placed in the request extensions
//!
//! # Security
//!
//! - Passwords are hashed with bcrypt before storage
//! - Tokens are HS256, expire five minutes after issue, and are never stored
//! - The signature half lives in an `HttpOnly` cookie
//! - Every credential failure returns 401; the reason is only logged

/// Token codec
pub mod sessions;

/// Credential cookies
pub mod cookies;

/// HTTP handlers for session endpoints
pub mod handlers;

pub use handlers::{login, signup};
pub use sessions::{SplitToken, TokenCodec, TokenError};

//! Authentication Handlers Module
//!
//! This module contains the HTTP handlers that issue sessions.
//!
//! # Module Structure
//!
//! ```text
//! handlers/
//! ├── mod.rs      - Module exports and documentation
//! ├── types.rs    - Request types
//! ├── signup.rs   - Account registration handler
//! └── login.rs    - Password login handler and session issuance
//! ```
//!
//! # Handlers
//!
//! - **`signup`** - POST /api/signup
//! - **`login`** - POST /api/login (behind the optional session guard)

/// Request types
pub mod types;

/// Signup handler
pub mod signup;

/// Login handler
pub mod login;

pub use types::{LoginRequest, SignupRequest};

pub use login::{login, session_response};
pub use signup::signup;

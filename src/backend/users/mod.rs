//! Users Module
//!
//! User search, avatar upload and account deletion.
//!
//! # Module Structure
//!
//! ```text
//! users/
//! ├── mod.rs      - Module exports
//! ├── handlers.rs - HTTP handlers
//! └── assets.rs   - Avatar files on disk
//! ```

pub mod assets;
pub mod handlers;

pub use handlers::{delete_user, search_users, update_profile_photo};

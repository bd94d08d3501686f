//! Posts Module
//!
//! Post listing and CRUD handlers.

pub mod handlers;

pub use handlers::{all_posts, create_post, delete_post, edit_post};

//! Storage Module
//!
//! This module defines the datastore contract the handlers depend on and its
//! two adapters.
//!
//! # Module Structure
//!
//! ```text
//! storage/
//! ├── mod.rs      - Datastore trait, StoreError, UniqueField, NewPost
//! ├── postgres.rs - PgStore (sqlx, PostgreSQL)
//! └── memory.rs   - MemoryStore (in-process, call recording and fault injection)
//! ```
//!
//! # Usage
//!
//! Handlers receive the store as `Arc<dyn Datastore>` through `AppState` and
//! only ever call it from inside a task runner unit:
//!
//! ```rust,ignore
//! let store = state.store.clone();
//! let posts = run_unit(&scope, "all_posts", move |_| async move {
//!     Ok(store.all_posts(before, PAGE_SIZE).await?)
//! })
//! .await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::shared::{Post, User, UserSummary};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage failures
#[derive(Debug, Error)]
pub enum StoreError {
    /// The addressed record does not exist
    #[error("record not found")]
    NotFound,

    /// Database driver error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A unique user column already holds the value
    #[error("duplicate {0:?}")]
    Duplicate(UniqueField),

    /// The store could not serve the call
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Unique columns of the users table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Name,
}

/// A post to be inserted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub body: String,
    pub created: DateTime<Utc>,
}

/// Persistence contract for users and posts
///
/// Listings return at most `limit` rows created strictly before `before`,
/// newest first.
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Users whose name contains `fragment`, case-insensitively
    async fn search_users(
        &self,
        fragment: &str,
        before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<UserSummary>, StoreError>;

    /// Insert a new user
    async fn create_user(&self, user: &User) -> Result<(), StoreError>;

    /// Whether an account already uses `email`
    async fn email_taken(&self, email: &str) -> Result<bool, StoreError>;

    /// Whether an account already uses `name`
    async fn name_taken(&self, name: &str) -> Result<bool, StoreError>;

    /// Full user record for `email`
    async fn user_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// Replace a user's avatar file name
    async fn update_user_avatar(
        &self,
        id: Uuid,
        avatar: &str,
        updated: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Delete a user together with their posts
    async fn delete_user(&self, id: Uuid) -> Result<(), StoreError>;

    /// Posts from every author
    async fn all_posts(&self, before: DateTime<Utc>, limit: i64) -> Result<Vec<Post>, StoreError>;

    /// A single post with its author
    async fn one_post(&self, id: Uuid) -> Result<Post, StoreError>;

    /// Insert a new post
    async fn create_post(&self, post: &NewPost) -> Result<(), StoreError>;

    /// Replace a post's title and body
    async fn update_post(
        &self,
        id: Uuid,
        title: &str,
        body: &str,
        updated: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Delete a post
    async fn delete_post(&self, id: Uuid) -> Result<(), StoreError>;
}

/**
 * User and Post Data Structures
 *
 * This module defines the records the API stores and returns. The full
 * `User` record never leaves the server; responses use `PublicUser` or, for
 * search hits, `UserSummary`. Both drop the email address and password hash.
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Avatar assigned to every new account until a photo is uploaded
pub const DEFAULT_AVATAR: &str = "puppy.jpg";

/// Page size for cursor-based listings
pub const PAGE_SIZE: i64 = 10;

/// A stored user account
///
/// # Fields
/// * `id` - Unique user ID
/// * `name` - Unique display name
/// * `email` - Unique email address
/// * `password_hash` - bcrypt hash, never the plaintext
/// * `avatar` - File name of the current avatar
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub avatar: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
}

impl User {
    /// Public view of this user
    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            name: self.name.clone(),
            avatar: self.avatar.clone(),
        }
    }

    /// Search view of this user, carrying the paging key
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            avatar: self.avatar.clone(),
            created: self.created,
        }
    }
}

/// User fields that are safe to return to any client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub avatar: String,
}

/// A search hit; `created` is the `prev` cursor for the next page
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub avatar: String,
    pub created: DateTime<Utc>,
}

/// A user's post, joined with its author
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub body: String,
    pub created: DateTime<Utc>,
    pub updated: DateTime<Utc>,
    pub author: PublicUser,
}

/// Result of an avatar update, returned to the uploader
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AvatarUpdate {
    pub id: Uuid,
    pub avatar: String,
    pub updated: DateTime<Utc>,
}

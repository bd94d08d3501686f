//! Shared Module
//!
//! This module contains the data types and validation rules used by the
//! HTTP handlers and the storage adapters alike. Nothing in here performs
//! I/O.
//!
//! # Overview
//!
//! - **`models`** - User and post records and their public views
//! - **`validation`** - Field rules for signup, posts, search and cursors
//! - **`error`** - Validation error type

/// User and post records
pub mod models;

/// Request validation rules
pub mod validation;

/// Shared error types
pub mod error;

/// Re-export commonly used types for convenience
pub use error::SharedError;
pub use models::{
    AvatarUpdate, Post, PublicUser, User, UserSummary, DEFAULT_AVATAR, PAGE_SIZE,
};

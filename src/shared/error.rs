//! Shared Error Types
//!
//! This module defines the error types produced by request validation.
//! They carry enough detail for the server log while the HTTP layer decides
//! how much of it reaches the client.
//!
//! # Error Categories
//!
//! - `ValidationError` - A request field failed validation
//! - `CursorError` - A pagination cursor could not be parsed
//!
//! # Usage
//!
//! ```rust
//! use snippets::shared::error::SharedError;
//!
//! let error = SharedError::validation("email", "invalid email");
//! assert!(error.to_string().contains("email"));
//! ```
use thiserror::Error;

/// Validation errors shared by all request handlers
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// Data validation error
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },

    /// Pagination cursor is not an RFC 3339 timestamp
    #[error("Invalid cursor '{value}'")]
    CursorError {
        /// The raw cursor value received
        value: String,
    },
}

impl SharedError {
    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new cursor error
    pub fn cursor(value: impl Into<String>) -> Self {
        Self::CursorError {
            value: value.into(),
        }
    }

    /// Message that is safe to show to the client
    pub fn client_message(&self) -> String {
        match self {
            Self::ValidationError { message, .. } => message.clone(),
            Self::CursorError { .. } => "invalid cursor".to_string(),
        }
    }
}

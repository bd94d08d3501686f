/**
 * Backend Error Types
 *
 * This module defines the error taxonomy every handler, middleware and
 * background unit reports through. Each variant maps to exactly one HTTP
 * status code.
 *
 * # Error Categories
 *
 * | Variant | Status | Typical cause |
 * |---|---|---|
 * | `InputInvalid` | 400 | malformed or missing fields, oversize upload |
 * | `Unauthenticated` | 401 | missing, invalid or expired split credential |
 * | `Forbidden` | 403 | authenticated but not the resource owner |
 * | `NotFound` | 404 | resource absent |
 * | `Cancelled` | 408 | client disconnect or soft deadline |
 * | `RateLimited` | 429 | per-client budget exhausted |
 * | `Upstream` | 500 | storage or filesystem failure |
 *
 * None of these are retried by the server.
 */

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use thiserror::Error;

use crate::backend::storage::{StoreError, UniqueField};
use crate::shared::SharedError;

/// Backend error taxonomy
///
/// `detail` fields are for the server log only. The client sees the message
/// returned by [`ApiError::client_message`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request input failed validation
    #[error("Invalid input: {detail}")]
    InputInvalid {
        /// Message shown to the client
        message: String,
        /// Detail for the log
        detail: String,
    },

    /// Missing or invalid session credential
    #[error("Unauthenticated: {detail}")]
    Unauthenticated { detail: String },

    /// Authenticated but not allowed to touch the resource
    #[error("Forbidden: {detail}")]
    Forbidden { detail: String },

    /// State-changing request without a valid CSRF token
    #[error("CSRF check failed: {detail}")]
    CsrfInvalid { detail: String },

    /// Resource does not exist
    #[error("Not found: {detail}")]
    NotFound { detail: String },

    /// The request was cancelled or hit its soft deadline
    #[error("Request cancelled before completion")]
    Cancelled,

    /// Per-client request budget exhausted
    #[error("Rate limit reached")]
    RateLimited,

    /// Storage or filesystem failure
    #[error("Upstream failure: {detail}")]
    Upstream { detail: String },
}

impl ApiError {
    /// Invalid input with a client-visible message
    pub fn input(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::InputInvalid {
            detail: message.clone(),
            message,
        }
    }

    /// Missing or invalid credentials
    pub fn unauthenticated(detail: impl Into<String>) -> Self {
        Self::Unauthenticated {
            detail: detail.into(),
        }
    }

    /// Ownership check failed
    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::Forbidden {
            detail: detail.into(),
        }
    }

    /// CSRF token missing or wrong
    pub fn csrf(detail: impl Into<String>) -> Self {
        Self::CsrfInvalid {
            detail: detail.into(),
        }
    }

    /// Resource not found
    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound {
            detail: detail.into(),
        }
    }

    /// Storage, filesystem or other collaborator failure
    pub fn upstream(detail: impl std::fmt::Display) -> Self {
        Self::Upstream {
            detail: detail.to_string(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InputInvalid { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } | Self::CsrfInvalid { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Cancelled => StatusCode::REQUEST_TIMEOUT,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Upstream { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message that is safe to send to the client
    pub fn client_message(&self) -> String {
        match self {
            Self::InputInvalid { message, .. } => message.clone(),
            Self::CsrfInvalid { .. } => "CSRF token invalid".to_string(),
            Self::Cancelled => {
                "We could not process your request at this time. Please try again later."
                    .to_string()
            }
            other => other
                .status_code()
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
        }
    }
}

impl From<SharedError> for ApiError {
    fn from(err: SharedError) -> Self {
        Self::InputInvalid {
            message: err.client_message(),
            detail: err.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::not_found("record not found"),
            StoreError::Duplicate(UniqueField::Email) => {
                Self::input("there is already an account with that email address")
            }
            StoreError::Duplicate(UniqueField::Name) => Self::input("username already taken"),
            other => Self::upstream(other),
        }
    }
}

/// Extractor rejections become 400s with a generic client message
macro_rules! impl_from_rejection {
    ($($rejection:ty => $message:literal),* $(,)?) => {
        $(
            impl From<$rejection> for ApiError {
                fn from(rejection: $rejection) -> Self {
                    Self::InputInvalid {
                        message: $message.to_string(),
                        detail: rejection.body_text(),
                    }
                }
            }
        )*
    };
}

impl_from_rejection! {
    JsonRejection => "invalid request body",
    QueryRejection => "invalid query",
    PathRejection => "invalid path",
    MultipartRejection => "invalid form",
    MultipartError => "invalid form",
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        Self::upstream(format!("filesystem: {err}"))
    }
}

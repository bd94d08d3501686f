//! Custom assertion macros and utilities
//!
//! Provides assertion macros for the JSON bodies the API returns.

/// Assert that an error body carries the given status and message
macro_rules! assert_error_body {
    ($body:expr, $status:expr, $message:expr) => {
        assert_eq!(
            $body["status"], $status,
            "unexpected status in error body: {}",
            $body
        );
        assert_eq!(
            $body["error"], $message,
            "unexpected message in error body: {}",
            $body
        );
    };
}

/// Assert that a success body carries the given message
macro_rules! assert_message {
    ($body:expr, $message:expr) => {
        assert_eq!(
            $body["message"], $message,
            "unexpected message in body: {}",
            $body
        );
    };
}

/// Assert that a string contains a substring
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        assert!(
            $haystack.contains($needle),
            "Expected '{}' to contain '{}'",
            $haystack,
            $needle
        );
    };
}

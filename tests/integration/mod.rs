//! Integration tests
//!
//! Drive the full router over an in-memory datastore.

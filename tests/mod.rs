//! Test suite for snippets
//!
//! This module organizes all tests

pub mod integration;

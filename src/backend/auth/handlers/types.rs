/**
 * Authentication Handler Types
 *
 * Request bodies for signup and login. Missing fields deserialize as empty
 * strings so they fail validation with the same message as blank ones.
 */

use serde::{Deserialize, Serialize};

/// Sign up request
#[derive(Deserialize, Serialize, Debug, Default)]
#[serde(default)]
pub struct SignupRequest {
    /// Display name (1-15 chars, letters, digits and underscores)
    pub name: String,
    /// Email address, unique per account
    pub email: String,
    /// Plaintext password, hashed before storage
    pub password: String,
}

/// Login request
#[derive(Deserialize, Serialize, Debug, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

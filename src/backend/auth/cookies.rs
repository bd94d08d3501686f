/**
 * Credential Cookies
 *
 * The split credential travels in two cookies with different exposure:
 *
 * - `token-hp` holds `header.payload`. It is `Secure` but readable from
 *   scripts, so the client can inspect its own session (user ID, expiry).
 * - `token-s` holds the signature. It is `Secure` and `HttpOnly`, so a
 *   script that reads `token-hp` still cannot replay the session.
 *
 * Both are session cookies on issue (no `Max-Age`). On account deletion both
 * are overwritten with an empty value that expires immediately.
 */

use axum::http::{
    header::{COOKIE, SET_COOKIE},
    HeaderMap, HeaderValue,
};
use thiserror::Error;

use crate::backend::auth::sessions::SplitToken;

/// Cookie carrying `header.payload`
pub const CLIENT_COOKIE: &str = "token-hp";

/// Cookie carrying the signature
pub const OPAQUE_COOKIE: &str = "token-s";

/// Why the credential could not be read from the request
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CredentialError {
    #[error("cookie {0} is absent")]
    Absent(&'static str),
    #[error("cookie {0} is malformed")]
    Malformed(&'static str),
}

/// Find a cookie value by name across all `Cookie` headers
///
/// Returns `None` when the cookie is not present, and `Some("")` when it is
/// present with an empty value.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim())
}

/// Read both credential parts from the request headers
pub fn read_credential(headers: &HeaderMap) -> Result<(String, String), CredentialError> {
    let client = read_part(headers, CLIENT_COOKIE)?;
    let opaque = read_part(headers, OPAQUE_COOKIE)?;
    Ok((client, opaque))
}

fn read_part(headers: &HeaderMap, name: &'static str) -> Result<String, CredentialError> {
    match get_cookie(headers, name) {
        None => Err(CredentialError::Absent(name)),
        Some("") => Err(CredentialError::Malformed(name)),
        Some(value) => Ok(value.to_string()),
    }
}

/// Append `Set-Cookie` headers issuing both credential cookies
pub fn set_credential(headers: &mut HeaderMap, token: &SplitToken, secure: bool) {
    let secure_attr = if secure { "; Secure" } else { "" };

    let client = format!("{CLIENT_COOKIE}={}; Path=/{secure_attr}", token.client_part);
    let opaque = format!(
        "{OPAQUE_COOKIE}={}; Path=/{secure_attr}; HttpOnly",
        token.opaque_part
    );

    append_set_cookie(headers, &client);
    append_set_cookie(headers, &opaque);
}

/// Append `Set-Cookie` headers expiring both credential cookies
pub fn expire_credential(headers: &mut HeaderMap) {
    for name in [CLIENT_COOKIE, OPAQUE_COOKIE] {
        append_set_cookie(headers, &format!("{name}=; Path=/; Max-Age=0"));
    }
}

/// Append one `Set-Cookie` header; values must be base64url
pub fn append_set_cookie(headers: &mut HeaderMap, cookie: &str) {
    match HeaderValue::from_str(cookie) {
        Ok(value) => {
            headers.append(SET_COOKIE, value);
        }
        Err(e) => tracing::error!("Refusing to emit invalid Set-Cookie header: {}", e),
    }
}

/**
 * CSRF Middleware
 *
 * Double-submit tokens. The browser keeps a random 32-byte secret in the
 * `_csrf` cookie (`HttpOnly`, `SameSite=Strict`). Every response carries a
 * masked copy of that secret in `X-CSRF-Token`, and the client sends the
 * latest copy back in the same header on state-changing requests.
 *
 * A masked token is `base64url(pad || pad XOR secret)` with a fresh random
 * pad, so the header value differs on every response while the secret in
 * the cookie stays the same.
 *
 * # Checks
 *
 * `GET`, `HEAD`, `OPTIONS` and `TRACE` pass through. Any other method is
 * answered with 403 "CSRF token invalid" before a handler runs when:
 * 1. The `_csrf` cookie is absent or not a valid secret
 * 2. The `X-CSRF-Token` header is absent
 * 3. The header does not unmask to the cookie's secret
 *
 * Rejections still carry a fresh token (and a new cookie if there was none),
 * so the client can retry.
 */

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::RngCore;

use crate::backend::auth::cookies::{append_set_cookie, get_cookie};
use crate::backend::error::ApiError;
use crate::backend::middleware::logging::request_id;
use crate::backend::server::state::AppState;

/// Cookie holding the encoded secret
pub const CSRF_COOKIE: &str = "_csrf";

/// Header carrying the masked token in both directions
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Cookie lifetime, twelve hours
const CSRF_MAX_AGE_SECS: u64 = 12 * 60 * 60;

const SECRET_LEN: usize = 32;

/// Per-browser CSRF secret
pub type CsrfSecret = [u8; SECRET_LEN];

/// Fresh random secret
pub fn generate_secret() -> CsrfSecret {
    let mut secret = [0u8; SECRET_LEN];
    rand::thread_rng().fill_bytes(&mut secret);
    secret
}

/// Cookie value for `secret`
pub fn encode_secret(secret: &CsrfSecret) -> String {
    URL_SAFE_NO_PAD.encode(secret)
}

/// Parse a cookie value back into a secret
pub fn decode_secret(value: &str) -> Option<CsrfSecret> {
    URL_SAFE_NO_PAD.decode(value).ok()?.try_into().ok()
}

/// Header value for `secret` under a fresh one-time pad
pub fn mask_token(secret: &CsrfSecret) -> String {
    let mut pad = [0u8; SECRET_LEN];
    rand::thread_rng().fill_bytes(&mut pad);

    let mut masked = Vec::with_capacity(SECRET_LEN * 2);
    masked.extend_from_slice(&pad);
    masked.extend(pad.iter().zip(secret).map(|(p, s)| p ^ s));
    URL_SAFE_NO_PAD.encode(masked)
}

fn unmask_token(token: &str) -> Option<CsrfSecret> {
    let raw = URL_SAFE_NO_PAD.decode(token).ok()?;
    if raw.len() != SECRET_LEN * 2 {
        return None;
    }

    let (pad, masked) = raw.split_at(SECRET_LEN);
    let mut secret = [0u8; SECRET_LEN];
    for (out, (p, m)) in secret.iter_mut().zip(pad.iter().zip(masked)) {
        *out = p ^ m;
    }
    Some(secret)
}

/// Whether `token` was masked from `secret`
pub fn token_matches(secret: &CsrfSecret, token: &str) -> bool {
    match unmask_token(token) {
        // Constant time over the full secret
        Some(candidate) => candidate
            .iter()
            .zip(secret)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0,
        None => false,
    }
}

fn is_safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

/// Why a state-changing request failed the check, if it did
fn rejection_reason(secret: Option<&CsrfSecret>, headers: &HeaderMap) -> Option<&'static str> {
    let presented = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok());
    match (secret, presented) {
        (None, _) => Some("missing or malformed CSRF cookie"),
        (Some(_), None) => Some("missing CSRF token header"),
        (Some(secret), Some(token)) if !token_matches(secret, token) => {
            Some("CSRF token does not match cookie")
        }
        _ => None,
    }
}

/// CSRF middleware
pub async fn csrf_middleware(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let existing = get_cookie(request.headers(), CSRF_COOKIE).and_then(decode_secret);

    let rejected = if is_safe_method(request.method()) {
        None
    } else {
        rejection_reason(existing.as_ref(), request.headers())
    };

    let mut response = match rejected {
        Some(reason) => {
            tracing::warn!(
                request_id = request_id(request.headers()),
                uri = %request.uri(),
                method = %request.method(),
                reason,
                "CSRF check failed"
            );
            ApiError::csrf(reason).into_response()
        }
        None => next.run(request).await,
    };

    let secret = match existing {
        Some(secret) => secret,
        None => {
            let secret = generate_secret();
            let secure = if app_state.config.secure_cookies { "; Secure" } else { "" };
            let cookie = format!(
                "{CSRF_COOKIE}={}; Path=/; Max-Age={CSRF_MAX_AGE_SECS}; HttpOnly; SameSite=Strict{secure}",
                encode_secret(&secret)
            );
            append_set_cookie(response.headers_mut(), &cookie);
            secret
        }
    };

    match HeaderValue::from_str(&mask_token(&secret)) {
        Ok(value) => {
            response.headers_mut().insert(CSRF_HEADER, value);
        }
        Err(e) => tracing::error!("Refusing to emit invalid CSRF header: {}", e),
    }

    response
}

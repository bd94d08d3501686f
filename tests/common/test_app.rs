//! Test application
//!
//! Builds the real router over a `MemoryStore` and a temporary assets
//! folder, and drives it with `tower::ServiceExt::oneshot`.
//!
//! The request builders attach a valid CSRF cookie and header, so tests
//! only meet the CSRF layer when they build requests by hand.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, request::Builder, Method, Request, Response},
    Router,
};
use tempfile::TempDir;
use tower::ServiceExt;

use snippets::backend::middleware::csrf::{
    encode_secret, generate_secret, mask_token, CSRF_COOKIE, CSRF_HEADER,
};
use snippets::backend::routes::create_router;
use snippets::backend::server::{AppState, ServerConfig};
use snippets::backend::storage::MemoryStore;

pub const TEST_KEY: &[u8] = b"integration-test-signing-key";
pub const TEST_ISSUER: &str = "snippets-test";
pub const BOUNDARY: &str = "snippets-test-boundary";

/// Configuration with a cheap bcrypt cost and a generous rate budget
pub fn test_config(assets_dir: &Path) -> ServerConfig {
    ServerConfig {
        jwt_key: TEST_KEY.to_vec(),
        jwt_issuer: TEST_ISSUER.to_string(),
        database_url: None,
        port: 0,
        assets_dir: assets_dir.to_path_buf(),
        rate_per_second: 1000.0,
        rate_ttl: Duration::from_secs(3600),
        soft_timeout: Duration::from_secs(5),
        hard_timeout: Duration::from_secs(10),
        secure_cookies: true,
        bcrypt_cost: 4,
        log_file: None,
    }
}

/// Router plus handles on everything behind it
pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
    pub assets: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(adjust: impl FnOnce(&mut ServerConfig)) -> Self {
        let assets = TempDir::new().expect("failed to create assets dir");
        let mut config = test_config(assets.path());
        adjust(&mut config);

        let store = MemoryStore::new();
        let state = AppState::new(config, Arc::new(store.clone()));

        Self {
            router: create_router(state),
            store,
            assets,
        }
    }

    /// Send one request through the full middleware stack
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }
}

/// `_csrf` cookie pair and a matching `X-CSRF-Token` value
pub fn csrf_pair() -> (String, String) {
    let secret = generate_secret();
    (
        format!("{CSRF_COOKIE}={}", encode_secret(&secret)),
        mask_token(&secret),
    )
}

/// Add `cookie` plus a fresh CSRF cookie and header
fn with_cookies(builder: Builder, cookie: Option<&str>) -> Builder {
    let (csrf_cookie, csrf_token) = csrf_pair();
    let cookie = match cookie {
        Some(cookie) => format!("{cookie}; {csrf_cookie}"),
        None => csrf_cookie,
    };
    builder
        .header(header::COOKIE, cookie)
        .header(CSRF_HEADER, csrf_token)
}

/// Percent-encode the characters of an RFC 3339 timestamp that need it
pub fn urlencode(raw: &str) -> String {
    raw.replace('+', "%2B").replace(':', "%3A")
}

/// Request without a body
pub fn empty(method: Method, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let builder = Request::builder().method(method).uri(uri);
    with_cookies(builder, cookie).body(Body::empty()).unwrap()
}

/// Request with a JSON body
pub fn json(method: Method, uri: &str, cookie: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    with_cookies(builder, cookie)
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// `PUT` with a multipart form holding a single file field
pub fn multipart(uri: &str, cookie: Option<&str>, field: &str, contents: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"upload.bin\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    let builder = Request::builder()
        .method(Method::PUT)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
    with_cookies(builder, cookie).body(Body::from(body)).unwrap()
}

/// Read a JSON body
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// All `Set-Cookie` headers of a response
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Turn `Set-Cookie` headers into a `Cookie` request header value
pub fn cookie_header(set_cookies: &[String]) -> String {
    set_cookies
        .iter()
        .filter_map(|c| c.split(';').next())
        .collect::<Vec<_>>()
        .join("; ")
}

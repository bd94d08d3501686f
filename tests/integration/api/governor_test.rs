//! Rate and timeout governor integration tests
//!
//! Request budgets per client, CSRF tokens, the soft deadline, the hard
//! timeout and the JSON fallback for unknown routes.

use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use pretty_assertions::assert_eq;
use snippets::backend::middleware::csrf::{decode_secret, token_matches, CSRF_COOKIE, CSRF_HEADER};

use crate::common::*;

fn signup_request(cookie: Option<&str>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/signup")
        .header("content-type", "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header("cookie", cookie);
    }
    if let Some(token) = token {
        builder = builder.header(CSRF_HEADER, token);
    }
    let body = serde_json::json!({
        "name": "User1",
        "email": "user1@example.com",
        "password": TEST_PASSWORD,
    });
    builder.body(Body::from(body.to_string())).unwrap()
}

fn csrf_cookie(response: &axum::http::Response<Body>) -> Option<String> {
    set_cookies(response)
        .into_iter()
        .find(|c| c.starts_with(&format!("{CSRF_COOKIE}=")))
}

fn from_client(uri: &str, ip: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .header("x-forwarded-for", ip)
        .header("x-request-id", "governor-test")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_rate_limit_per_client() {
    let app = TestApp::with_config(|config| config.rate_per_second = 1.0);

    let first = app.send(from_client("/api/posts", "203.0.113.1")).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = app.send(from_client("/api/posts", "203.0.113.1")).await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let body = body_json(second).await;
    assert_error_body!(body, 429, "Too Many Requests");

    // Another client has its own budget
    let other = app.send(from_client("/api/posts", "203.0.113.2")).await;
    assert_eq!(other.status(), StatusCode::OK);

    // The limited request never reached the store
    assert_eq!(app.store.call_count("all_posts").await, 2);
}

#[tokio::test]
async fn test_rate_limit_runs_before_session_guard() {
    let app = TestApp::with_config(|config| config.rate_per_second = 1.0);

    let first = app.send(json(Method::POST, "/api/post", None, serde_json::json!({}))).await;
    assert_eq!(first.status(), StatusCode::UNAUTHORIZED);

    let second = app.send(json(Method::POST, "/api/post", None, serde_json::json!({}))).await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_soft_deadline() {
    let app = TestApp::with_config(|config| {
        config.soft_timeout = Duration::from_millis(50);
        config.hard_timeout = Duration::from_secs(5);
    });
    app.store.delay("all_posts", Duration::from_millis(500)).await;

    let response = app.send(empty(Method::GET, "/api/posts", None)).await;

    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    let body = body_json(response).await;
    assert_eq!(body["status"], 408);
    assert_contains!(body["error"].as_str().unwrap(), "try again later");
}

#[tokio::test]
async fn test_soft_deadline_stops_writes() {
    let app = TestApp::with_config(|config| {
        config.soft_timeout = Duration::from_millis(50);
        config.hard_timeout = Duration::from_secs(5);
    });
    let author = seed_user(&app.store, "author").await;
    let post_id = seed_post(&app.store, author.id, "kept", 5).await;
    app.store.delay("one_post", Duration::from_millis(300)).await;

    let response = app
        .send(empty(
            Method::DELETE,
            &format!("/api/post/{post_id}"),
            Some(&session_cookie(author.id)),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

    // Give a straggling unit time to act on a stale decision
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(app.store.call_count("delete_post").await, 0);
    assert_eq!(app.store.post_count().await, 1);
}

#[tokio::test]
async fn test_hard_timeout() {
    let app = TestApp::with_config(|config| {
        config.soft_timeout = Duration::from_secs(5);
        config.hard_timeout = Duration::from_millis(50);
    });
    app.store.delay("all_posts", Duration::from_millis(500)).await;

    let response = app.send(empty(Method::GET, "/api/posts", None)).await;

    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
}

#[tokio::test]
async fn test_unknown_route() {
    let app = TestApp::new();

    let response = app.send(empty(Method::GET, "/api/nothing-here", None)).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn test_safe_request_receives_csrf_token() {
    let app = TestApp::new();

    let response = app.send(from_client("/api/posts", "203.0.113.5")).await;

    assert_eq!(response.status(), StatusCode::OK);
    let token = response.headers()[CSRF_HEADER].to_str().unwrap().to_string();
    let cookie = csrf_cookie(&response).expect("no CSRF cookie issued");
    assert_contains!(cookie, "HttpOnly");
    assert_contains!(cookie, "SameSite=Strict");
    assert_contains!(cookie, "Secure");

    let pair = cookie_header(&[cookie]);
    let secret = decode_secret(pair.trim_start_matches("_csrf=")).unwrap();
    assert!(token_matches(&secret, &token));

    // The token from a safe response unlocks a state-changing request
    let response = app.send(signup_request(Some(&pair), Some(&token))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(csrf_cookie(&response).is_none());
    assert!(response.headers().contains_key(CSRF_HEADER));
    assert_eq!(app.store.users().await.len(), 1);
}

#[tokio::test]
async fn test_missing_csrf_token_rejected() {
    let app = TestApp::new();
    let (cookie, _) = csrf_pair();

    for (cookie, token) in [(None, None), (Some(cookie.as_str()), None)] {
        let response = app.send(signup_request(cookie, token)).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        // A fresh token comes back so the client can retry
        assert!(response.headers().contains_key(CSRF_HEADER));
        let body = body_json(response).await;
        assert_error_body!(body, 403, "CSRF token invalid");
    }

    assert!(app.store.calls().await.is_empty());
}

#[tokio::test]
async fn test_mismatched_csrf_token_rejected() {
    let app = TestApp::new();
    let (cookie, _) = csrf_pair();
    let (_, other_token) = csrf_pair();

    let response = app.send(signup_request(Some(&cookie), Some(&other_token))).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_error_body!(body, 403, "CSRF token invalid");

    let response = app.send(signup_request(Some(&cookie), Some("forged"))).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert!(app.store.calls().await.is_empty());
}

#[tokio::test]
async fn test_csrf_check_runs_before_session_guard() {
    let app = TestApp::new();
    let user = seed_user(&app.store, "User1").await;

    let request = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/profile/{}", user.id))
        .header("cookie", session_cookie(user.id))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.store.users().await.len(), 1);
}

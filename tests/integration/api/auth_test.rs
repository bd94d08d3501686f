//! Authentication API integration tests
//!
//! Signup, login and the session guard, driven through the full router.

use axum::http::{Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::json;
use uuid::Uuid;

use crate::common::*;

fn signup_body(name: &str, email: &str, password: &str) -> serde_json::Value {
    json!({ "name": name, "email": email, "password": password })
}

#[tokio::test]
async fn test_signup_success() {
    let app = TestApp::new();

    let response = app
        .send(json(
            Method::POST,
            "/api/signup",
            None,
            signup_body("User1", "user1@example.com", TEST_PASSWORD),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert!(cookies[0].starts_with("token-hp="));
    assert!(!cookies[0].contains("HttpOnly"));
    assert!(cookies[1].starts_with("token-s="));
    assert_contains!(cookies[1], "HttpOnly");
    assert!(cookies.iter().all(|c| c.contains("Secure")));

    let body = body_json(response).await;
    assert_message!(body, "account created!");

    assert_eq!(app.store.call_count("create_user").await, 1);
    let users = app.store.users().await;
    assert_eq!(users.len(), 1);
    let user = &users[0];
    assert_eq!(user.name, "User1");
    assert_eq!(user.avatar, "puppy.jpg");
    assert_ne!(user.password_hash, TEST_PASSWORD);
    assert!(bcrypt::verify(TEST_PASSWORD, &user.password_hash).unwrap());

    // The issued credential names the new account
    let header = cookie_header(&cookies);
    let (client, opaque) = header
        .split_once("; ")
        .map(|(a, b)| {
            (
                a.trim_start_matches("token-hp=").to_string(),
                b.trim_start_matches("token-s=").to_string(),
            )
        })
        .unwrap();
    assert_eq!(test_codec().parse(&client, &opaque).unwrap(), user.id);
}

#[tokio::test]
async fn test_signup_weak_password_never_reaches_store() {
    let app = TestApp::new();

    let response = app
        .send(json(
            Method::POST,
            "/api/signup",
            None,
            signup_body("User1", "user1@example.com", "abcd1234"),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(set_cookies(&response).is_empty());
    let body = body_json(response).await;
    assert_error_body!(body, 400, "invalid password");
    assert!(app.store.calls().await.is_empty());
}

#[tokio::test]
async fn test_signup_invalid_fields() {
    let app = TestApp::new();

    let cases = [
        (signup_body("", "a@example.com", TEST_PASSWORD), "invalid name, email, and/or password"),
        (signup_body("bad name", "a@example.com", TEST_PASSWORD), "invalid name"),
        (signup_body("User1", "not-an-email", TEST_PASSWORD), "invalid email"),
    ];

    for (payload, message) in cases {
        let response = app.send(json(Method::POST, "/api/signup", None, payload)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_error_body!(body, 400, message);
    }

    assert!(app.store.calls().await.is_empty());
}

#[tokio::test]
async fn test_signup_duplicate_email() {
    let app = TestApp::new();
    seed_user(&app.store, "taken").await;

    let response = app
        .send(json(
            Method::POST,
            "/api/signup",
            None,
            signup_body("Fresh", "taken@example.com", TEST_PASSWORD),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_error_body!(body, 400, "there is already an account with that email address");
    assert_eq!(app.store.call_count("create_user").await, 0);
}

#[tokio::test]
async fn test_signup_duplicate_name() {
    let app = TestApp::new();
    seed_user(&app.store, "taken").await;

    let response = app
        .send(json(
            Method::POST,
            "/api/signup",
            None,
            signup_body("taken", "fresh@example.com", TEST_PASSWORD),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_error_body!(body, 400, "username already taken");
    assert_eq!(app.store.call_count("create_user").await, 0);
}

#[tokio::test]
async fn test_concurrent_signups_with_same_email() {
    let app = TestApp::new();
    // Both requests pass the availability check before either insert runs
    app.store
        .delay("create_user", std::time::Duration::from_millis(200))
        .await;

    let (first, second) = tokio::join!(
        app.send(json(
            Method::POST,
            "/api/signup",
            None,
            signup_body("User1", "same@example.com", TEST_PASSWORD),
        )),
        app.send(json(
            Method::POST,
            "/api/signup",
            None,
            signup_body("User2", "same@example.com", TEST_PASSWORD),
        )),
    );

    let mut statuses = vec![first.status(), second.status()];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::BAD_REQUEST]);

    let loser = if first.status() == StatusCode::BAD_REQUEST { first } else { second };
    assert!(set_cookies(&loser).is_empty());
    let body = body_json(loser).await;
    assert_error_body!(body, 400, "there is already an account with that email address");

    assert_eq!(app.store.call_count("create_user").await, 2);
    assert_eq!(app.store.users().await.len(), 1);
}

#[tokio::test]
async fn test_signup_storage_failure() {
    let app = TestApp::new();
    app.store.fail_on("create_user").await;

    let response = app
        .send(json(
            Method::POST,
            "/api/signup",
            None,
            signup_body("User1", "user1@example.com", TEST_PASSWORD),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(set_cookies(&response).is_empty());
    let body = body_json(response).await;
    assert_eq!(body["status"], 500);
}

#[tokio::test]
async fn test_signup_malformed_json() {
    let app = TestApp::new();

    let (csrf_cookie, csrf_token) = csrf_pair();
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/api/signup")
        .header("content-type", "application/json")
        .header("cookie", csrf_cookie)
        .header("x-csrf-token", csrf_token)
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_error_body!(body, 400, "invalid request body");
}

#[tokio::test]
async fn test_login_success() {
    let app = TestApp::new();
    let user = seed_user(&app.store, "User1").await;

    let response = app
        .send(json(
            Method::POST,
            "/api/login",
            None,
            json!({ "email": user.email, "password": TEST_PASSWORD }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    let body = body_json(response).await;
    assert_message!(body, "logged in!");

    // The new session opens protected routes
    let response = app
        .send(json(
            Method::POST,
            "/api/post",
            Some(&cookie_header(&cookies)),
            json!({ "title": "hello", "body": "world" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_wrong_password() {
    let app = TestApp::new();
    let user = seed_user(&app.store, "User1").await;

    let response = app
        .send(json(
            Method::POST,
            "/api/login",
            None,
            json!({ "email": user.email, "password": "Wrong1234!" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn test_login_unknown_email() {
    let app = TestApp::new();

    let response = app
        .send(json(
            Method::POST,
            "/api/login",
            None,
            json!({ "email": "nobody@example.com", "password": TEST_PASSWORD }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["status"], 401);
}

#[tokio::test]
async fn test_login_blank_fields() {
    let app = TestApp::new();

    let response = app
        .send(json(Method::POST, "/api/login", None, json!({ "email": "" })))
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_error_body!(body, 400, "invalid email and/or password");
    assert!(app.store.calls().await.is_empty());
}

#[tokio::test]
async fn test_login_with_valid_session_short_circuits() {
    let app = TestApp::new();
    let cookie = session_cookie(Uuid::new_v4());

    let response = app
        .send(json(
            Method::POST,
            "/api/login",
            Some(&cookie),
            json!({ "email": "ignored@example.com", "password": "ignored" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(set_cookies(&response).is_empty());
    assert!(app.store.calls().await.is_empty());
}

#[tokio::test]
async fn test_login_with_expired_session_falls_through() {
    let app = TestApp::new();
    let user = seed_user(&app.store, "User1").await;
    let cookie = expired_session_cookie(user.id);

    let response = app
        .send(json(
            Method::POST,
            "/api/login",
            Some(&cookie),
            json!({ "email": user.email, "password": TEST_PASSWORD }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(set_cookies(&response).len(), 2);
    assert_eq!(app.store.call_count("user_by_email").await, 1);
}

#[tokio::test]
async fn test_guard_missing_cookie() {
    let app = TestApp::new();

    let response = app
        .send(json(
            Method::POST,
            "/api/post",
            None,
            json!({ "title": "t", "body": "b" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_error_body!(body, 401, "Unauthorized");
    assert!(app.store.calls().await.is_empty());
}

#[tokio::test]
async fn test_guard_half_credential() {
    let app = TestApp::new();
    let split = test_codec().issue(Uuid::new_v4()).unwrap();

    let response = app
        .send(json(
            Method::POST,
            "/api/post",
            Some(&format!("token-hp={}", split.client_part)),
            json!({ "title": "t", "body": "b" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_guard_expired_session() {
    let app = TestApp::new();
    let user = seed_user(&app.store, "User1").await;

    let response = app
        .send(json(
            Method::POST,
            "/api/post",
            Some(&expired_session_cookie(user.id)),
            json!({ "title": "t", "body": "b" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.store.call_count("create_post").await, 0);
}

#[tokio::test]
async fn test_guard_foreign_key() {
    let app = TestApp::new();
    let foreign = snippets::backend::auth::TokenCodec::new(b"some-other-key", TEST_ISSUER)
        .issue(Uuid::new_v4())
        .unwrap();

    let response = app
        .send(json(
            Method::POST,
            "/api/post",
            Some(&format!(
                "token-hp={}; token-s={}",
                foreign.client_part, foreign.opaque_part
            )),
            json!({ "title": "t", "body": "b" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_guard_wrong_issuer() {
    let app = TestApp::new();
    let foreign = snippets::backend::auth::TokenCodec::new(TEST_KEY, "someone-else")
        .issue(Uuid::new_v4())
        .unwrap();

    let response = app
        .send(json(
            Method::POST,
            "/api/post",
            Some(&format!(
                "token-hp={}; token-s={}",
                foreign.client_part, foreign.opaque_part
            )),
            json!({ "title": "t", "body": "b" }),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

//! End-to-end flows through the full router: login, register, guard,
//! refresh, logout.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use auth_test_utils::{cookie_header, set_cookie_value, set_cookies, TestTokenBuilder, TEST_JWT_SECRET};
use common::{setup, TestHarness};

async fn body_json(response: Response) -> Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collects")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body is JSON")
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request builds")
}

fn get_with_cookies(uri: &str, cookies: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .header(header::COOKIE, cookies)
        .body(Body::empty())
        .expect("request builds")
}

fn post_with_cookies(uri: &str, cookies: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, cookies)
        .body(Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn test_login_success_sets_cookies_and_returns_pair() {
    let TestHarness { app, store, state, .. } = setup().await;
    store.insert_user("alice@example.com", "alice", "secret1").await;

    let response = app
        .oneshot(post_json(
            "/api/auth/login",
            json!({"email": "alice@example.com", "password": "secret1"}),
        ))
        .await
        .expect("router call succeeds");

    assert_eq!(response.status(), StatusCode::OK);

    let access_cookie = set_cookie_value(&response, "accessToken").expect("access cookie set");
    let refresh_cookie = set_cookie_value(&response, "refreshToken").expect("refresh cookie set");

    for cookie in set_cookies(&response) {
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Path=/"));
        // Non-production config: no Secure flag.
        assert!(!cookie.contains("Secure"));
    }

    let body = body_json(response).await;
    assert_eq!(body["status"], "success");
    assert_eq!(body["tokens"]["accessToken"], access_cookie);
    assert_eq!(body["tokens"]["refreshToken"], refresh_cookie);

    let payload = state.tokens.verify(&access_cookie).expect("access verifies");
    assert_eq!(payload.email, "alice@example.com");
}

#[tokio::test]
async fn test_login_wrong_password_is_unauthorized() {
    let TestHarness { app, store, .. } = setup().await;
    store.insert_user("alice@example.com", "alice", "secret1").await;

    let response = app
        .oneshot(post_json(
            "/api/auth/login",
            json!({"email": "alice@example.com", "password": "wrong"}),
        ))
        .await
        .expect("router call succeeds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
    assert_eq!(body["error"]["message"], "Invalid credentials");
}

#[tokio::test]
async fn test_login_unknown_email_reports_same_error_as_bad_password() {
    let TestHarness { app, .. } = setup().await;

    let response = app
        .oneshot(post_json(
            "/api/auth/login",
            json!({"email": "nobody@example.com", "password": "secret1"}),
        ))
        .await
        .expect("router call succeeds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_login_missing_fields_is_bad_request() {
    let TestHarness { app, .. } = setup().await;

    let response = app
        .oneshot(post_json(
            "/api/auth/login",
            json!({"email": "alice@example.com"}),
        ))
        .await
        .expect("router call succeeds");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_register_creates_user() {
    let TestHarness { app, store, state, .. } = setup().await;

    let response = app
        .oneshot(post_json(
            "/api/auth/register",
            json!({"email": "bob@example.com", "username": "bob", "password": "secret2"}),
        ))
        .await
        .expect("router call succeeds");

    assert_eq!(response.status(), StatusCode::CREATED);
    // Register returns the pair in the body only; cookies come from login.
    assert!(set_cookies(&response).is_empty());

    let body = body_json(response).await;
    let access = body["tokens"]["accessToken"].as_str().expect("access token");
    let payload = state.tokens.verify(access).expect("access verifies");
    assert_eq!(payload.email, "bob@example.com");

    assert_eq!(store.user_count().await, 1);
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts_without_create_message() {
    let TestHarness { app, store, transport, .. } = setup().await;
    store.insert_user("alice@example.com", "alice", "secret1").await;

    let response = app
        .oneshot(post_json(
            "/api/auth/register",
            json!({"email": "alice@example.com", "username": "alice2", "password": "x-secret"}),
        ))
        .await
        .expect("router call succeeds");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "CONFLICT");

    // The pre-check fails first: no create request ever reaches the store.
    assert_eq!(transport.published_to("user.create").await, 0);
    assert_eq!(store.user_count().await, 1);
}

#[tokio::test]
async fn test_register_duplicate_username_conflicts_via_store() {
    let TestHarness { app, store, .. } = setup().await;
    store.insert_user("alice@example.com", "alice", "secret1").await;

    // Different email passes the pre-check; the store rejects the username.
    let response = app
        .oneshot(post_json(
            "/api/auth/register",
            json!({"email": "other@example.com", "username": "alice", "password": "x-secret"}),
        ))
        .await
        .expect("router call succeeds");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(store.user_count().await, 1);
}

#[tokio::test]
async fn test_me_with_valid_access_token() {
    let TestHarness { app, .. } = setup().await;

    let access = TestTokenBuilder::new(TEST_JWT_SECRET)
        .for_subject(42, "alice@example.com")
        .build();

    let response = app
        .oneshot(get_with_cookies(
            "/api/auth/me",
            &cookie_header(&[("accessToken", &access)]),
        ))
        .await
        .expect("router call succeeds");

    assert_eq!(response.status(), StatusCode::OK);
    // No renewal happened, so no cookie is written.
    assert!(set_cookies(&response).is_empty());

    let body = body_json(response).await;
    assert_eq!(body["user"]["id"], 42);
    assert_eq!(body["user"]["email"], "alice@example.com");
}

#[tokio::test]
async fn test_me_renews_silently_with_expired_access_and_valid_refresh() {
    let TestHarness { app, state, .. } = setup().await;

    let expired_access = TestTokenBuilder::new(TEST_JWT_SECRET)
        .for_subject(42, "alice@example.com")
        .expires_in(-60)
        .build();
    let refresh = TestTokenBuilder::new(TEST_JWT_SECRET)
        .for_subject(42, "alice@example.com")
        .expires_in(604800)
        .build();

    let response = app
        .oneshot(get_with_cookies(
            "/api/auth/me",
            &cookie_header(&[("accessToken", &expired_access), ("refreshToken", &refresh)]),
        ))
        .await
        .expect("router call succeeds");

    assert_eq!(response.status(), StatusCode::OK);

    // Silent renewal emits only the access cookie.
    let new_access = set_cookie_value(&response, "accessToken").expect("access cookie renewed");
    assert_eq!(set_cookie_value(&response, "refreshToken"), None);

    let payload = state.tokens.verify(&new_access).expect("new access verifies");
    assert_eq!(payload.sub, 42);

    let body = body_json(response).await;
    assert_eq!(body["user"]["id"], 42);
}

#[tokio::test]
async fn test_me_expired_access_without_refresh_is_rejected() {
    let TestHarness { app, .. } = setup().await;

    let expired_access = TestTokenBuilder::new(TEST_JWT_SECRET)
        .for_subject(42, "alice@example.com")
        .expires_in(-60)
        .build();

    let response = app
        .oneshot(get_with_cookies(
            "/api/auth/me",
            &cookie_header(&[("accessToken", &expired_access)]),
        ))
        .await
        .expect("router call succeeds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());
}

#[tokio::test]
async fn test_me_with_expired_refresh_is_rejected() {
    let TestHarness { app, .. } = setup().await;

    let expired_refresh = TestTokenBuilder::new(TEST_JWT_SECRET)
        .for_subject(42, "alice@example.com")
        .expires_in(-60)
        .build();

    let response = app
        .oneshot(get_with_cookies(
            "/api/auth/me",
            &cookie_header(&[("refreshToken", &expired_refresh)]),
        ))
        .await
        .expect("router call succeeds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["message"], "Invalid refresh token");
}

#[tokio::test]
async fn test_me_without_cookies_is_rejected() {
    let TestHarness { app, .. } = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/auth/me")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router call succeeds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_rotates_both_cookies() {
    let TestHarness { app, state, .. } = setup().await;

    let refresh = TestTokenBuilder::new(TEST_JWT_SECRET)
        .for_subject(42, "alice@example.com")
        .expires_in(604800)
        .build();

    let response = app
        .oneshot(post_with_cookies(
            "/api/auth/refresh",
            &cookie_header(&[("refreshToken", &refresh)]),
        ))
        .await
        .expect("router call succeeds");

    assert_eq!(response.status(), StatusCode::OK);

    // The handler owns the cookie state here; the guard's silent renewal
    // must not append a competing access cookie on top.
    assert_eq!(set_cookies(&response).len(), 2);

    let new_access = set_cookie_value(&response, "accessToken").expect("access cookie set");
    let new_refresh = set_cookie_value(&response, "refreshToken").expect("refresh cookie set");

    let access_payload = state.tokens.verify(&new_access).expect("access verifies");
    let refresh_payload = state.tokens.verify(&new_refresh).expect("refresh verifies");
    assert_eq!(access_payload.sub, 42);
    assert_eq!(refresh_payload.sub, 42);

    let body = body_json(response).await;
    assert_eq!(body["status"], "success");
    assert!(body["tokens"]["accessToken"].is_string());
}

#[tokio::test]
async fn test_refresh_without_cookies_is_rejected() {
    let TestHarness { app, .. } = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/auth/refresh")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router call succeeds");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_logout_clears_both_cookies() {
    let TestHarness { app, .. } = setup().await;

    let access = TestTokenBuilder::new(TEST_JWT_SECRET)
        .for_subject(42, "alice@example.com")
        .build();
    let refresh = TestTokenBuilder::new(TEST_JWT_SECRET)
        .for_subject(42, "alice@example.com")
        .expires_in(604800)
        .build();

    let response = app
        .oneshot(post_with_cookies(
            "/api/auth/logout",
            &cookie_header(&[("accessToken", &access), ("refreshToken", &refresh)]),
        ))
        .await
        .expect("router call succeeds");

    assert_eq!(response.status(), StatusCode::OK);

    let cleared: Vec<_> = set_cookies(&response)
        .into_iter()
        .filter(|c| c.contains("Max-Age=0"))
        .collect();
    assert_eq!(cleared.len(), 2);
    assert_eq!(set_cookie_value(&response, "accessToken").as_deref(), Some(""));
    assert_eq!(set_cookie_value(&response, "refreshToken").as_deref(), Some(""));

    let body = body_json(response).await;
    assert_eq!(body["message"], "Logged out successfully");
}

#[tokio::test]
async fn test_logout_with_expired_access_still_ends_cleared() {
    let TestHarness { app, .. } = setup().await;

    let expired_access = TestTokenBuilder::new(TEST_JWT_SECRET)
        .for_subject(42, "alice@example.com")
        .expires_in(-60)
        .build();
    let refresh = TestTokenBuilder::new(TEST_JWT_SECRET)
        .for_subject(42, "alice@example.com")
        .expires_in(604800)
        .build();

    let response = app
        .oneshot(post_with_cookies(
            "/api/auth/logout",
            &cookie_header(&[("accessToken", &expired_access), ("refreshToken", &refresh)]),
        ))
        .await
        .expect("router call succeeds");

    assert_eq!(response.status(), StatusCode::OK);

    // The guard silently renewed to admit the request, but logout's cleared
    // cookies are the final state: no renewal cookie may follow them.
    let cookies = set_cookies(&response);
    assert_eq!(cookies.len(), 2);
    assert!(cookies.iter().all(|c| c.contains("Max-Age=0")));
}

#[tokio::test]
async fn test_health_check() {
    let TestHarness { app, .. } = setup().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("router call succeeds");

    assert_eq!(response.status(), StatusCode::OK);
}

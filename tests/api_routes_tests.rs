// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP surface tests.
//!
//! These tests verify that:
//! 1. Session-bound requests carry a browsing context cookie, and the
//!    context registry stays bounded
//! 2. Login, registration and logout drive the routing decision
//! 3. Page, search and error responses have the expected shape

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use common::{
    create_test_app, create_test_app_with, principal, LoginOutcome, ScriptedIdentityProvider,
};
use serde_json::{json, Value};
use std::time::Duration;
use studysphere_client::config::Config;
use tower::ServiceExt;

mod common;

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn send_json(method: &str, uri: &str, cookie: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post(uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

/// `name=value` of the browsing context cookie set by `response`.
fn context_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("studysphere_ctx="))
        .and_then(|v| v.split(';').next())
        .map(str::to_string)
}

async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Open a browsing context and return its cookie.
async fn open_context(app: &Router) -> String {
    let response = send(app, get("/auth/session", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    context_cookie(&response).expect("context cookie issued")
}

#[tokio::test]
async fn test_health_needs_no_context() {
    let app = create_test_app(ScriptedIdentityProvider::new(LoginOutcome::Manual));

    let response = send(&app.router, get("/health", None)).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(context_cookie(&response).is_none());
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn test_first_request_opens_signed_out_context() {
    let app = create_test_app(ScriptedIdentityProvider::new(LoginOutcome::Manual));

    let response = send(&app.router, get("/auth/session", None)).await;
    let cookie = context_cookie(&response).expect("cookie");
    let body = json_body(response).await;

    assert_eq!(body["session"]["state"], "unauthenticated");
    assert_eq!(body["registration"], json!({"status": "unknown", "route": "landing"}));
    assert_eq!(app.state.contexts.len(), 1);

    // The same cookie reuses the context
    let again = send(&app.router, get("/auth/session", Some(&cookie))).await;
    assert!(context_cookie(&again).is_none());
    assert_eq!(app.state.contexts.len(), 1);
}

#[tokio::test]
async fn test_forged_cookie_gets_fresh_context() {
    let app = create_test_app(ScriptedIdentityProvider::new(LoginOutcome::Manual));

    let response = send(
        &app.router,
        get("/auth/session", Some("studysphere_ctx=0123456789abcdef0123456789abcdef")),
    )
    .await;

    let issued = context_cookie(&response).expect("fresh cookie");
    assert_ne!(issued, "studysphere_ctx=0123456789abcdef0123456789abcdef");
}

#[tokio::test]
async fn test_search_routes_open_no_context() {
    let app = create_test_app(ScriptedIdentityProvider::new(LoginOutcome::Manual));
    app.backend.add_group("Physics", principal(3), vec![], 0);

    for _ in 0..200 {
        let response = send(&app.router, get("/api/groups", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(context_cookie(&response).is_none());
    }
    let response = send(&app.router, get("/api/search?term=phys", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_eq!(app.state.contexts.len(), 0);
}

#[tokio::test]
async fn test_context_registry_is_capped() {
    let config = Config {
        max_contexts: 3,
        ..Config::test_default()
    };
    let app = create_test_app_with(ScriptedIdentityProvider::new(LoginOutcome::Manual), config);

    let first = open_context(&app.router).await;
    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(2)).await;
        open_context(&app.router).await;
    }

    assert_eq!(app.state.contexts.len(), 3);
    // The oldest context was evicted, so its cookie is replaced
    let again = send(&app.router, get("/auth/session", Some(&first))).await;
    assert!(context_cookie(&again).is_some());
}

#[tokio::test]
async fn test_idle_contexts_are_swept() {
    let config = Config {
        context_idle_secs: 0,
        ..Config::test_default()
    };
    let app = create_test_app_with(ScriptedIdentityProvider::new(LoginOutcome::Manual), config);
    open_context(&app.router).await;
    open_context(&app.router).await;

    tokio::time::sleep(Duration::from_millis(5)).await;

    assert_eq!(app.state.sweep_idle_contexts(), 2);
    assert!(app.state.contexts.is_empty());
}

#[tokio::test]
async fn test_login_register_logout_flow() {
    let app = create_test_app(ScriptedIdentityProvider::new(LoginOutcome::Succeed(
        principal(1),
    )));
    let cookie = open_context(&app.router).await;

    let login = json_body(send(&app.router, post("/auth/login", &cookie)).await).await;
    assert_eq!(login["session"]["state"], "authenticated");
    assert_eq!(login["session"]["principal_text"], principal(1).to_text());
    assert_eq!(login["registration"]["route"], "register");

    let registered = send(
        &app.router,
        send_json("POST", "/api/register", &cookie, json!({"username": "nova"})),
    )
    .await;
    assert_eq!(registered.status(), StatusCode::OK);
    assert_eq!(
        json_body(registered).await,
        json!({"status": "registered", "username": "nova", "route": "profile"})
    );

    let profile = send(&app.router, get("/api/profile", Some(&cookie))).await;
    assert_eq!(profile.status(), StatusCode::OK);
    let profile = json_body(profile).await;
    assert_eq!(profile["loading"], false);
    assert_eq!(profile["view"]["username"], "nova");

    let logout = json_body(send(&app.router, post("/auth/logout", &cookie)).await).await;
    assert_eq!(logout["session"]["state"], "unauthenticated");
    assert_eq!(logout["registration"]["route"], "landing");

    let profile = send(&app.router, get("/api/profile", Some(&cookie))).await;
    assert_eq!(profile.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_failed_login_returns_reason() {
    let app = create_test_app(ScriptedIdentityProvider::new(LoginOutcome::Fail(
        "UserInterrupt".to_string(),
    )));
    let cookie = open_context(&app.router).await;

    let body = json_body(send(&app.router, post("/auth/login", &cookie)).await).await;

    assert_eq!(body["session"]["state"], "failed");
    assert_eq!(body["session"]["reason"], "UserInterrupt");
    assert_eq!(body["registration"]["status"], "unknown");
}

#[tokio::test]
async fn test_second_login_conflicts_while_first_pending() {
    let identity = ScriptedIdentityProvider::new(LoginOutcome::Manual);
    let app = create_test_app(identity.clone());
    let cookie = open_context(&app.router).await;

    let first = tokio::spawn({
        let router = app.router.clone();
        let request = post("/auth/login", &cookie);
        async move { router.oneshot(request).await.unwrap() }
    });
    identity.wait_for_pending().await;

    let second = send(&app.router, post("/auth/login", &cookie)).await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert_eq!(json_body(second).await["error"], "login_in_progress");

    identity.complete_success(principal(2));
    let first = first.await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_register_requires_sign_in() {
    let app = create_test_app(ScriptedIdentityProvider::new(LoginOutcome::Manual));
    let cookie = open_context(&app.router).await;

    let response = send(
        &app.router,
        send_json("POST", "/api/register", &cookie, json!({"username": "nova"})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_home_for_guest() {
    let app = create_test_app(ScriptedIdentityProvider::new(LoginOutcome::Manual));
    app.backend
        .add_group("Physics", principal(3), vec![principal(3)], 0);
    let cookie = open_context(&app.router).await;

    let response = send(&app.router, get("/api/home", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["loading"], false);
    assert_eq!(body["view"]["user_name"], "Guest");
    assert_eq!(body["view"]["group_count"], 1);
}

#[tokio::test]
async fn test_search_routes() {
    let app = create_test_app(ScriptedIdentityProvider::new(LoginOutcome::Manual));
    app.backend.add_user(principal(4), "alice");
    let cookie = open_context(&app.router).await;

    let found = send(
        &app.router,
        get("/api/search?term=ali&category=users", Some(&cookie)),
    )
    .await;
    assert_eq!(found.status(), StatusCode::OK);
    let found = json_body(found).await;
    assert_eq!(found["category"], "users");
    assert_eq!(found["items"][0]["label"], "alice");

    let bad = send(
        &app.router,
        get("/api/search?term=ali&category=tags", Some(&cookie)),
    )
    .await;
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(bad).await["error"], "validation_error");
}

#[tokio::test]
async fn test_leave_unknown_page() {
    let app = create_test_app(ScriptedIdentityProvider::new(LoginOutcome::Manual));
    let cookie = open_context(&app.router).await;

    let ok = send(&app.router, post("/api/pages/home/leave", &cookie)).await;
    assert_eq!(ok.status(), StatusCode::NO_CONTENT);

    let missing = send(&app.router, post("/api/pages/settings/leave", &cookie)).await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cors_preflight_allows_frontend() {
    let app = create_test_app(ScriptedIdentityProvider::new(LoginOutcome::Manual));

    let response = send(
        &app.router,
        Request::builder()
            .method("OPTIONS")
            .uri("/auth/session")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .unwrap(),
        "http://localhost:5173"
    );
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .unwrap(),
        "true"
    );
}

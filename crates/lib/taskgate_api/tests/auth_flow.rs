//! Integration tests: auth endpoints, pipeline outcomes, error envelope.

mod common;

use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use common::{PASSWORD, app, app_with, assert_error, auth_settings};
use serde_json::json;
use taskgate_core::settings::RateLimitSettings;

#[tokio::test]
async fn root_and_health_are_public() {
    let app = app();

    let root = app.call(Method::GET, "/", None, None).await;
    assert_eq!(root.status, StatusCode::OK);
    assert_eq!(root.json["status"], "running");
    assert!(root.json["version"].is_string());

    let health = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.json["status"], "healthy");
    assert!(health.json["timestamp"].is_string());
}

#[tokio::test]
async fn register_returns_public_identity() {
    let app = app();
    let resp = app
        .call(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({
                "email": "a@x.com",
                "password": PASSWORD,
                "first_name": "Ada",
            })),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json["email"], "a@x.com");
    assert_eq!(resp.json["first_name"], "Ada");
    assert_eq!(resp.json["is_active"], true);
    assert!(resp.json.get("password").is_none());
    assert!(resp.json.get("password_hash").is_none());
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
    let app = app();
    app.register("a@x.com").await;
    let resp = app.register("a@x.com").await;
    assert_error(&resp, StatusCode::CONFLICT, "DuplicateResourceError", "/auth/register");
}

#[tokio::test]
async fn registration_input_is_validated() {
    let app = app();
    let bad_email = app
        .call(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": "not-an-email", "password": PASSWORD })),
        )
        .await;
    assert_error(&bad_email, StatusCode::BAD_REQUEST, "ValidationError", "/auth/register");

    let short_password = app
        .call(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": "a@x.com", "password": "short" })),
        )
        .await;
    let message = assert_error(
        &short_password,
        StatusCode::BAD_REQUEST,
        "ValidationError",
        "/auth/register",
    );
    assert!(message.contains("at least 8"), "{message}");
}

#[tokio::test]
async fn malformed_json_uses_error_envelope() {
    let app = app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let resp = app.send(request).await;
    assert_error(&resp, StatusCode::BAD_REQUEST, "ValidationError", "/auth/login");
}

#[tokio::test]
async fn login_issues_bearer_pair() {
    let app = app();
    app.register("a@x.com").await;
    let resp = app.login("a@x.com", PASSWORD).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json["token_type"], "bearer");
    assert_eq!(resp.json["expires_in"], 30 * 60);
    let access = resp.json["access_token"].as_str().unwrap();
    let refresh = resp.json["refresh_token"].as_str().unwrap();
    assert_eq!(access.split('.').count(), 3);
    assert_ne!(access, refresh);
}

#[tokio::test]
async fn bad_credentials_share_one_message() {
    let app = app();
    app.register("a@x.com").await;

    let wrong_password = app.login("a@x.com", "wrong-password").await;
    let unknown_email = app.login("nobody@x.com", PASSWORD).await;

    for resp in [&wrong_password, &unknown_email] {
        let message =
            assert_error(resp, StatusCode::UNAUTHORIZED, "AuthenticationError", "/auth/login");
        assert_eq!(message, "Incorrect email or password");
        assert_eq!(resp.headers[header::WWW_AUTHENTICATE], "Bearer");
    }
}

#[tokio::test]
async fn me_requires_a_valid_access_token() {
    let app = app();
    let (user_id, access, refresh) = app.signed_up("a@x.com").await;

    let missing = app.call(Method::GET, "/auth/me", None, None).await;
    let message = assert_error(&missing, StatusCode::UNAUTHORIZED, "AuthenticationError", "/auth/me");
    assert_eq!(message, "Not authenticated");
    assert_eq!(missing.headers[header::WWW_AUTHENTICATE], "Bearer");

    let basic = app
        .send(
            Request::builder()
                .uri("/auth/me")
                .header(header::AUTHORIZATION, "Basic abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_error(&basic, StatusCode::UNAUTHORIZED, "AuthenticationError", "/auth/me");

    let lowercase_scheme = app
        .send(
            Request::builder()
                .uri("/auth/me")
                .header(header::AUTHORIZATION, format!("bearer {access}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_error(&lowercase_scheme, StatusCode::UNAUTHORIZED, "AuthenticationError", "/auth/me");

    let with_refresh = app.call(Method::GET, "/auth/me", Some(&refresh), None).await;
    assert_error(&with_refresh, StatusCode::UNAUTHORIZED, "AuthenticationError", "/auth/me");
    assert_eq!(with_refresh.headers[header::WWW_AUTHENTICATE], "Bearer");

    let tampered = format!("{access}x");
    let bad_sig = app.call(Method::GET, "/auth/me", Some(&tampered), None).await;
    assert_error(&bad_sig, StatusCode::UNAUTHORIZED, "AuthenticationError", "/auth/me");

    let ok = app.call(Method::GET, "/auth/me", Some(&access), None).await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(ok.json["id"], user_id.as_str());
    assert_eq!(ok.json["email"], "a@x.com");
}

#[tokio::test]
async fn refresh_accepts_only_refresh_tokens() {
    let app = app();
    let (_, access, refresh) = app.signed_up("a@x.com").await;

    let wrong_kind = app
        .call(
            Method::POST,
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": access })),
        )
        .await;
    assert_error(&wrong_kind, StatusCode::UNAUTHORIZED, "AuthenticationError", "/auth/refresh");

    let ok = app
        .call(
            Method::POST,
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
    assert_eq!(ok.status, StatusCode::OK);
    let new_access = ok.json["access_token"].as_str().unwrap();
    let me = app.call(Method::GET, "/auth/me", Some(new_access), None).await;
    assert_eq!(me.status, StatusCode::OK);
}

#[tokio::test]
async fn profile_update_changes_names_only_when_given() {
    let app = app();
    let (_, access, _) = app.signed_up("a@x.com").await;

    let updated = app
        .call(
            Method::PUT,
            "/auth/me",
            Some(&access),
            Some(json!({ "first_name": "Grace" })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert_eq!(updated.json["first_name"], "Grace");
    assert!(updated.json["last_name"].is_null());

    let too_long = app
        .call(
            Method::PUT,
            "/auth/me",
            Some(&access),
            Some(json!({ "last_name": "x".repeat(51) })),
        )
        .await;
    assert_error(&too_long, StatusCode::BAD_REQUEST, "ValidationError", "/auth/me");
}

#[tokio::test]
async fn deactivated_accounts_cannot_log_in_or_refresh() {
    let app = app();
    let (_, access, refresh) = app.signed_up("a@x.com").await;

    let deactivated = app.call(Method::DELETE, "/auth/me", Some(&access), None).await;
    assert_eq!(deactivated.status, StatusCode::OK);
    assert_eq!(deactivated.json["is_active"], false);

    let login = app.login("a@x.com", PASSWORD).await;
    let message = assert_error(&login, StatusCode::UNAUTHORIZED, "AuthenticationError", "/auth/login");
    assert_eq!(message, "Inactive user");

    let refreshed = app
        .call(
            Method::POST,
            "/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
    assert_error(&refreshed, StatusCode::UNAUTHORIZED, "AuthenticationError", "/auth/refresh");

    // Stateless access tokens outlive deactivation until they expire.
    let me = app.call(Method::GET, "/auth/me", Some(&access), None).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.json["is_active"], false);
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let app = app();
    let resp = app.call(Method::GET, "/nope", None, None).await;
    assert_error(&resp, StatusCode::NOT_FOUND, "NotFoundError", "/nope");
}

#[tokio::test]
async fn unsupported_methods_get_the_error_envelope() {
    let app = app();
    let resp = app.call(Method::PATCH, "/auth/login", None, None).await;
    let message = assert_error(
        &resp,
        StatusCode::METHOD_NOT_ALLOWED,
        "ValidationError",
        "/auth/login",
    );
    assert_eq!(message, "Method Not Allowed");

    let (user_id, access, _) = app.signed_up("a@x.com").await;
    let path = format!("/users/{user_id}/tasks");
    let resp = app.call(Method::PATCH, &path, Some(&access), None).await;
    assert_error(&resp, StatusCode::METHOD_NOT_ALLOWED, "ValidationError", &path);
}

#[tokio::test]
async fn identity_rate_limit_returns_429_with_budget() {
    let mut settings = auth_settings();
    settings.rate_limit = RateLimitSettings::new(3, Duration::from_secs(3600));
    let app = app_with(settings);
    let (_, access, _) = app.signed_up("a@x.com").await;

    for _ in 0..3 {
        let ok = app.call(Method::GET, "/auth/me", Some(&access), None).await;
        assert_eq!(ok.status, StatusCode::OK);
    }
    let limited = app.call(Method::GET, "/auth/me", Some(&access), None).await;
    let message = assert_error(
        &limited,
        StatusCode::TOO_MANY_REQUESTS,
        "RateLimitError",
        "/auth/me",
    );
    assert_eq!(message, "Rate limit exceeded. Maximum 3 requests per 3600 seconds.");

    // Public routes are never limited.
    let health = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(health.status, StatusCode::OK);
}

#[tokio::test]
async fn public_auth_endpoints_are_limited_per_client() {
    let mut settings = auth_settings();
    settings.public_rate_limit = RateLimitSettings::new(2, Duration::from_secs(60));
    let app = app_with(settings);

    let attempt = |ip: &str| {
        Request::builder()
            .method(Method::POST)
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(
                json!({ "email": "a@x.com", "password": PASSWORD }).to_string(),
            ))
            .unwrap()
    };

    for _ in 0..2 {
        let resp = app.send(attempt("10.0.0.1")).await;
        assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    }
    let limited = app.send(attempt("10.0.0.1")).await;
    assert_error(&limited, StatusCode::TOO_MANY_REQUESTS, "RateLimitError", "/auth/login");

    let other_client = app.send(attempt("10.0.0.2")).await;
    assert_eq!(other_client.status, StatusCode::UNAUTHORIZED);
}

//! Shared harness: full router over a `MemoryStore`, driven with `oneshot`.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use serde_json::{Value, json};
use taskgate_api::{AppState, config::ApiConfig, router};
use taskgate_core::settings::AuthSettings;
use taskgate_core::store::MemoryStore;
use tower::ServiceExt;

pub const PASSWORD: &str = "password123";

/// Fast bcrypt, fixed secret.
pub fn auth_settings() -> AuthSettings {
    let mut settings = AuthSettings::with_secret("integration-test-secret");
    settings.bcrypt_cost = 4;
    settings
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub json: Value,
}

pub fn app() -> TestApp {
    app_with(auth_settings())
}

pub fn app_with(settings: AuthSettings) -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(ApiConfig::with_auth(settings), store.clone());
    TestApp {
        router: router(state),
        store,
    }
}

pub fn build(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.expect("request");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("parse JSON")
        };
        TestResponse {
            status,
            headers,
            json,
        }
    }

    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        self.send(build(method, uri, token, body)).await
    }

    pub async fn register(&self, email: &str) -> TestResponse {
        self.call(
            Method::POST,
            "/auth/register",
            None,
            Some(json!({ "email": email, "password": PASSWORD })),
        )
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.call(
            Method::POST,
            "/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    /// Register + login. Returns `(user_id, access_token, refresh_token)`.
    pub async fn signed_up(&self, email: &str) -> (String, String, String) {
        let registered = self.register(email).await;
        assert_eq!(registered.status, StatusCode::OK, "{}", registered.json);
        let login = self.login(email, PASSWORD).await;
        assert_eq!(login.status, StatusCode::OK, "{}", login.json);
        (
            registered.json["id"].as_str().unwrap().to_string(),
            login.json["access_token"].as_str().unwrap().to_string(),
            login.json["refresh_token"].as_str().unwrap().to_string(),
        )
    }
}

/// Asserts the error envelope shape and returns the message.
pub fn assert_error(response: &TestResponse, status: StatusCode, kind: &str, path: &str) -> String {
    assert_eq!(response.status, status, "{}", response.json);
    let error = &response.json["error"];
    assert_eq!(error["type"], kind, "{}", response.json);
    assert_eq!(error["path"], path, "{}", response.json);
    error["message"].as_str().expect("message").to_string()
}

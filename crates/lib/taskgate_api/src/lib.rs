//! # taskgate_api
//!
//! HTTP API library for Taskgate.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use taskgate_core::auth::{CredentialHasher, RateLimiter, SlidingWindowLimiter, TokenCodec};
use taskgate_core::store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{auth, health, tasks};

/// Name reported by the root and health endpoints.
pub const SERVICE_NAME: &str = "Taskgate API";

/// Route paths.
pub mod routes {
    pub const ROOT: &str = "/";
    pub const HEALTH: &str = "/health";
    pub const AUTH_REGISTER: &str = "/auth/register";
    pub const AUTH_LOGIN: &str = "/auth/login";
    pub const AUTH_REFRESH: &str = "/auth/refresh";
    pub const AUTH_ME: &str = "/auth/me";
    pub const USER_TASKS: &str = "/users/{user_id}/tasks";
    pub const USER_TASKS_OVERDUE: &str = "/users/{user_id}/tasks/overdue";
    pub const USER_TASK: &str = "/users/{user_id}/tasks/{task_id}";
}

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Identity and task persistence.
    pub store: Arc<dyn Store>,
    /// API configuration.
    pub config: ApiConfig,
    pub hasher: CredentialHasher,
    pub tokens: Arc<TokenCodec>,
    /// Per-identity limiter for authenticated routes.
    pub limiter: Arc<dyn RateLimiter>,
    /// Per-client limiter for register/login/refresh.
    pub public_limiter: Arc<dyn RateLimiter>,
}

impl AppState {
    /// State with in-process sliding-window limiters built from `config`.
    pub fn new(config: ApiConfig, store: Arc<dyn Store>) -> Self {
        let limiter = Arc::new(SlidingWindowLimiter::new(config.auth.rate_limit));
        let public_limiter = Arc::new(SlidingWindowLimiter::new(config.auth.public_rate_limit));
        Self::with_limiters(config, store, limiter, public_limiter)
    }

    /// State with caller-supplied limiters.
    pub fn with_limiters(
        config: ApiConfig,
        store: Arc<dyn Store>,
        limiter: Arc<dyn RateLimiter>,
        public_limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        Self {
            hasher: CredentialHasher::new(config.auth.bcrypt_cost),
            tokens: Arc::new(TokenCodec::new(&config.auth)),
            store,
            config,
            limiter,
            public_limiter,
        }
    }
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(routes::ROOT, get(health::root))
        .route(routes::HEALTH, get(health::health))
        .route(routes::AUTH_REGISTER, post(auth::register_handler))
        .route(routes::AUTH_LOGIN, post(auth::login_handler))
        .route(routes::AUTH_REFRESH, post(auth::refresh_handler))
        .route(
            routes::AUTH_ME,
            get(auth::me_handler)
                .put(auth::update_me_handler)
                .delete(auth::deactivate_me_handler),
        )
        .route(
            routes::USER_TASKS,
            get(tasks::list_tasks_handler).post(tasks::create_task_handler),
        )
        .route(routes::USER_TASKS_OVERDUE, get(tasks::list_overdue_handler))
        .route(
            routes::USER_TASK,
            get(tasks::get_task_handler)
                .put(tasks::update_task_handler)
                .delete(tasks::delete_task_handler),
        )
        .fallback(error::not_found)
        .method_not_allowed_fallback(error::method_not_allowed)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::request_pipeline,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum::middleware::from_fn(error::attach_error_path))
        .with_state(state)
}

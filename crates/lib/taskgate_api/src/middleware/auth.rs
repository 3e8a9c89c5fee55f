//! Request pipeline: public bypass, identity resolution, rate limiting.
//!
//! Runs once ahead of route dispatch and stores an [`AuthOutcome`] in the
//! request extensions. A failed resolution does not reject here; routes that
//! need a caller extract [`CurrentUser`], which turns the recorded failure
//! into a 401.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{Method, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use taskgate_core::auth::{AuthFailure, AuthOutcome, Identity, RateLimiter, resolver};
use tracing::debug;

use crate::AppState;
use crate::error::AppError;
use crate::extract::client_key;

/// Routes that skip the pipeline entirely.
pub const PUBLIC_PATHS: &[&str] = &["/", "/health", "/docs", "/redoc", "/openapi.json"];

/// Unauthenticated auth endpoints, limited per client address.
pub const PUBLIC_AUTH_PATHS: &[&str] = &["/auth/register", "/auth/login", "/auth/refresh"];

fn admit(limiter: &dyn RateLimiter, key: &str) -> Result<(), AppError> {
    if limiter.admit(key) {
        return Ok(());
    }
    let policy = limiter.policy();
    debug!(key, limit = policy.requests, "rate limit exceeded");
    Err(AppError::RateLimited {
        limit: policy.requests,
        window_secs: policy.window.as_secs(),
    })
}

/// Axum middleware implementing the per-request pipeline.
pub async fn request_pipeline(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let path = request.uri().path();

    if request.method() == Method::OPTIONS || PUBLIC_PATHS.contains(&path) {
        request.extensions_mut().insert(AuthOutcome::Anonymous);
        return Ok(next.run(request).await);
    }

    if PUBLIC_AUTH_PATHS.contains(&path) {
        let key = client_key(request.headers(), request.extensions());
        admit(state.public_limiter.as_ref(), &key)?;
        request.extensions_mut().insert(AuthOutcome::Anonymous);
        return Ok(next.run(request).await);
    }

    let outcome = match request.headers().get(AUTHORIZATION) {
        None => resolver::resolve(None, &state.tokens),
        Some(value) => match value.to_str() {
            Ok(header) => resolver::resolve(Some(header), &state.tokens),
            Err(_) => AuthOutcome::Failed(AuthFailure::MalformedHeader),
        },
    };

    match &outcome {
        AuthOutcome::Resolved(identity) => admit(state.limiter.as_ref(), &identity.subject)?,
        AuthOutcome::Failed(reason) => debug!(path, %reason, "request not authenticated"),
        AuthOutcome::Anonymous => {}
    }

    request.extensions_mut().insert(outcome);
    Ok(next.run(request).await)
}

/// Authenticated caller, read from the outcome recorded by the pipeline.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthOutcome>() {
            Some(AuthOutcome::Resolved(identity)) => Ok(CurrentUser(identity.clone())),
            Some(AuthOutcome::Failed(reason)) => Err(reason.clone().into()),
            Some(AuthOutcome::Anonymous) | None => Err(AuthFailure::MissingCredentials.into()),
        }
    }
}

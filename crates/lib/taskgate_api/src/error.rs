//! Application error types and the JSON error envelope.
//!
//! Every non-2xx response carries
//! `{"error": {"type": <kind>, "message": <text>, "path": <request path>}}`.
//! [`AppError`] renders the body without a path and tags the response with an
//! [`ErrorDetail`] extension; [`attach_error_path`], the outermost layer,
//! rewrites the body once the request path is known.

use axum::{
    Json,
    extract::Request,
    http::{
        HeaderValue, StatusCode,
        header::{CONTENT_LENGTH, WWW_AUTHENTICATE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use taskgate_core::auth::{AuthError, AuthFailure};
use taskgate_core::store::StoreError;
use taskgate_core::tasks::TaskError;
use thiserror::Error;
use tracing::error;

/// Convenience alias for handler return types.
pub type AppResult<T> = Result<T, AppError>;

/// Error taxonomy exposed on the wire as `error.type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    ValidationError,
    DuplicateResourceError,
    AuthenticationError,
    AuthorizationError,
    NotFoundError,
    RateLimitError,
    InternalError,
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
            ErrorKind::DuplicateResourceError => StatusCode::CONFLICT,
            ErrorKind::AuthenticationError => StatusCode::UNAUTHORIZED,
            ErrorKind::AuthorizationError => StatusCode::FORBIDDEN,
            ErrorKind::NotFoundError => StatusCode::NOT_FOUND,
            ErrorKind::RateLimitError => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Application-level errors with HTTP status mapping.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Known path, unsupported method. Reported as a validation error with 405.
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Rate limit exceeded. Maximum {limit} requests per {window_secs} seconds.")]
    RateLimited { limit: u32, window_secs: u64 },

    /// Detail is logged server-side only.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) | AppError::MethodNotAllowed => ErrorKind::ValidationError,
            AppError::Duplicate(_) => ErrorKind::DuplicateResourceError,
            AppError::Unauthenticated(_) => ErrorKind::AuthenticationError,
            AppError::Forbidden(_) => ErrorKind::AuthorizationError,
            AppError::NotFound(_) => ErrorKind::NotFoundError,
            AppError::RateLimited { .. } => ErrorKind::RateLimitError,
            AppError::Internal(_) => ErrorKind::InternalError,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            other => other.kind().status(),
        }
    }

    /// Message safe to show the client.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Internal(_) => "An unexpected error occurred".into(),
            other => other.to_string(),
        }
    }
}

/// Wire body of an error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub message: String,
    pub path: String,
}

/// Response extension marking a rendered [`AppError`].
#[derive(Debug, Clone)]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(detail) = &self {
            error!(detail = %detail, "internal error");
        }
        let kind = self.kind();
        let status = self.status();
        let message = self.public_message();
        let body = ErrorEnvelope {
            error: ErrorBody {
                kind,
                message: message.clone(),
                path: String::new(),
            },
        };

        let mut response = (status, Json(body)).into_response();
        if kind == ErrorKind::AuthenticationError {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
            .extensions_mut()
            .insert(ErrorDetail { kind, message });
        response
    }
}

/// Outermost middleware: fills `error.path` on every envelope.
pub async fn attach_error_path(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let mut response = next.run(request).await;

    let Some(detail) = response.extensions_mut().remove::<ErrorDetail>() else {
        return response;
    };
    let (mut parts, _) = response.into_parts();
    parts.headers.remove(CONTENT_LENGTH);
    let envelope = ErrorEnvelope {
        error: ErrorBody {
            kind: detail.kind,
            message: detail.message,
            path,
        },
    };
    (parts, Json(envelope)).into_response()
}

/// Router fallback for unknown paths.
pub async fn not_found() -> AppError {
    AppError::NotFound("Not Found".into())
}

/// Router fallback for known paths hit with an unsupported method.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => AppError::Duplicate(msg),
            StoreError::NotFound(msg) => AppError::NotFound(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::CredentialError | AuthError::InactiveAccount => {
                AppError::Unauthenticated(e.to_string())
            }
            AuthError::Token(t) => AppError::from(AuthFailure::InvalidToken(t)),
            AuthError::ValidationError(msg) => AppError::Validation(msg),
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl From<AuthFailure> for AppError {
    fn from(e: AuthFailure) -> Self {
        AppError::Unauthenticated(e.to_string())
    }
}

impl From<TaskError> for AppError {
    fn from(e: TaskError) -> Self {
        match e {
            TaskError::Validation(msg) => AppError::Validation(msg),
            TaskError::NotFound => AppError::NotFound(e.to_string()),
            TaskError::Forbidden => AppError::Forbidden(e.to_string()),
            TaskError::Store(inner) => AppError::from(inner),
        }
    }
}

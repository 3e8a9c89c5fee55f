//! Root and health endpoints. Both bypass the request pipeline.

use axum::Json;
use chrono::Utc;

use crate::SERVICE_NAME;
use crate::models::{HealthResponse, RootResponse};

/// `GET /`: service banner.
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: format!("Welcome to {SERVICE_NAME}"),
        version: taskgate_core::version(),
        status: "running",
    })
}

/// `GET /health`: liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now(),
        service: SERVICE_NAME,
    })
}

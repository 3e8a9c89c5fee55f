//! Authentication request handlers.

use axum::Json;
use axum::extract::State;

use crate::AppState;
use crate::error::AppResult;
use crate::extract::ApiJson;
use crate::middleware::auth::CurrentUser;
use crate::models::{
    LoginRequest, RefreshRequest, RegisterRequest, TokenResponse, UserResponse,
    UserUpdateRequest,
};
use crate::services::auth;

/// `POST /auth/register`: create a new identity.
pub async fn register_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(auth::register(&state, body).await?))
}

/// `POST /auth/login`: authenticate with email + password.
pub async fn login_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    Ok(Json(auth::login(&state, body).await?))
}

/// `POST /auth/refresh`: exchange a refresh token for a new token pair.
pub async fn refresh_handler(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshRequest>,
) -> AppResult<Json<TokenResponse>> {
    Ok(Json(auth::refresh(&state, &body.refresh_token).await?))
}

/// `GET /auth/me`
pub async fn me_handler(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(auth::me(&state, &identity.subject).await?))
}

/// `PUT /auth/me`: update profile names.
pub async fn update_me_handler(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    ApiJson(body): ApiJson<UserUpdateRequest>,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(
        auth::update_profile(&state, &identity.subject, body).await?,
    ))
}

/// `DELETE /auth/me`: deactivate the caller.
pub async fn deactivate_me_handler(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> AppResult<Json<UserResponse>> {
    Ok(Json(auth::deactivate(&state, &identity.subject).await?))
}

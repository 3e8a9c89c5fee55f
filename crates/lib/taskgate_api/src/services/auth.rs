//! Authentication service: register, login, refresh and profile flows.
//!
//! Handlers stay thin; everything that touches the store, the hasher or the
//! token codec lives here.

use chrono::Utc;
use taskgate_core::auth::{AuthError, CredentialHasher};
use taskgate_core::models::auth::{HashedCredential, NewUser, TokenKind, User};
use taskgate_core::validation;
use tracing::{debug, info};

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{
    LoginRequest, RegisterRequest, TokenResponse, UserResponse, UserUpdateRequest,
};

// ---------------------------------------------------------------------------
// Password hashing off the async workers
// ---------------------------------------------------------------------------

async fn hash_password(hasher: CredentialHasher, password: String) -> AppResult<HashedCredential> {
    tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .map_err(|e| AppError::Internal(format!("hash task failed: {e}")))?
        .map_err(AppError::from)
}

async fn verify_password(
    hasher: CredentialHasher,
    password: String,
    hashed: HashedCredential,
) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || hasher.verify(&password, &hashed))
        .await
        .map_err(|e| AppError::Internal(format!("verify task failed: {e}")))
}

async fn burn_password(hasher: CredentialHasher, password: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || hasher.verify_missing(&password))
        .await
        .map_err(|e| AppError::Internal(format!("verify task failed: {e}")))
}

fn validate_names(first_name: Option<&str>, last_name: Option<&str>) -> AppResult<()> {
    validation::validate_name("first_name", first_name).map_err(AppError::Validation)?;
    validation::validate_name("last_name", last_name).map_err(AppError::Validation)?;
    Ok(())
}

/// Load the caller's identity record.
async fn load_user(state: &AppState, user_id: &str) -> AppResult<User> {
    state
        .store
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

// ---------------------------------------------------------------------------
// Public auth operations
// ---------------------------------------------------------------------------

/// Create a new identity. Duplicate email → 409.
pub async fn register(state: &AppState, req: RegisterRequest) -> AppResult<UserResponse> {
    validation::validate_email(&req.email).map_err(AppError::Validation)?;
    validation::validate_password(&req.password).map_err(AppError::Validation)?;
    validate_names(req.first_name.as_deref(), req.last_name.as_deref())?;

    let password_hash = hash_password(state.hasher, req.password).await?;
    let user = state
        .store
        .create_user(NewUser {
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            password_hash,
        })
        .await?;

    info!(user_id = %user.id, "user registered");
    Ok(user.into())
}

/// Authenticate with email + password. Unknown email and wrong password are
/// indistinguishable to the caller.
pub async fn login(state: &AppState, req: LoginRequest) -> AppResult<TokenResponse> {
    let Some(found) = state.store.find_user_by_email(&req.email).await? else {
        debug!("login for unknown email");
        burn_password(state.hasher, req.password).await?;
        return Err(AuthError::CredentialError.into());
    };

    if !verify_password(state.hasher, req.password, found.password_hash).await? {
        debug!(user_id = %found.user.id, "login with wrong password");
        return Err(AuthError::CredentialError.into());
    }
    if !found.user.is_active {
        return Err(AuthError::InactiveAccount.into());
    }

    let pair = state.tokens.issue_pair(&found.user.id)?;
    info!(user_id = %found.user.id, "user logged in");
    Ok(pair.into())
}

/// Exchange a refresh token for a new pair. The identity must still exist
/// and be active.
pub async fn refresh(state: &AppState, refresh_token: &str) -> AppResult<TokenResponse> {
    let claims = state
        .tokens
        .verify(refresh_token, TokenKind::Refresh)
        .map_err(AuthError::from)?;

    let user = state
        .store
        .get_user(&claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("User not found".into()))?;
    if !user.is_active {
        return Err(AuthError::InactiveAccount.into());
    }

    Ok(state.tokens.issue_pair(&user.id)?.into())
}

// ---------------------------------------------------------------------------
// Authenticated profile operations
// ---------------------------------------------------------------------------

/// Public fields of the caller's identity.
pub async fn me(state: &AppState, user_id: &str) -> AppResult<UserResponse> {
    Ok(load_user(state, user_id).await?.into())
}

/// Update the caller's names. Absent fields are left unchanged.
pub async fn update_profile(
    state: &AppState,
    user_id: &str,
    req: UserUpdateRequest,
) -> AppResult<UserResponse> {
    validate_names(req.first_name.as_deref(), req.last_name.as_deref())?;

    let mut user = load_user(state, user_id).await?;
    if let Some(first_name) = req.first_name {
        user.first_name = Some(first_name);
    }
    if let Some(last_name) = req.last_name {
        user.last_name = Some(last_name);
    }
    user.updated_at = Utc::now();

    Ok(state.store.update_user(&user).await?.into())
}

/// Mark the caller inactive. Login and refresh fail afterwards; access
/// tokens already issued stay valid until they expire.
pub async fn deactivate(state: &AppState, user_id: &str) -> AppResult<UserResponse> {
    let mut user = load_user(state, user_id).await?;
    user.is_active = false;
    user.updated_at = Utc::now();
    let user = state.store.update_user(&user).await?;
    info!(user_id = %user.id, "user deactivated");
    Ok(user.into())
}

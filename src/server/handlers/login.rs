//! Session acquire and release.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use crate::server::auth::{parse_token_header, verify_password};
use crate::server::{ApiError, AppState};

/// Account lock threshold for consecutive failed logins.
const MAX_LOGIN_FAILURES: i32 = 10;

#[derive(Deserialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

/// Password login. Failures are deliberately uniform: no signal about
/// whether the email exists, the password was wrong, or the account is
/// locked.
pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<LoginCredentials>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(user) = state.users.user_by_email(&credentials.email).await? else {
        return Err(ApiError::Unauthorized);
    };
    if user.locked {
        state
            .users
            .log_event("login_locked", Some(user.id), Some("/login"), None)
            .await;
        return Err(ApiError::Unauthorized);
    }
    let Some(hash) = user.password_hash.as_deref() else {
        return Err(ApiError::Unauthorized);
    };
    if !verify_password(hash, &credentials.password) {
        state
            .users
            .record_login_failure(user.id, MAX_LOGIN_FAILURES)
            .await?;
        state
            .users
            .log_event("login_failure", Some(user.id), Some("/login"), None)
            .await;
        return Err(ApiError::Unauthorized);
    }

    state.users.record_login_success(user.id).await?;
    let token = state.users.issue_token(user.id).await?;
    Ok(Json(serde_json::json!({
        "token": token,
        "admin": user.admin,
    })))
}

/// Invalidate the presented session token.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_token_header)
        .ok_or(ApiError::Unauthorized)?;
    state.users.remove_token(token).await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

// ============================================================================
// Authentication Routes
// ============================================================================
//
// - POST /auth/signup: create an account with a declared role
// - POST /auth/login: verify credentials, mint an access token
// - POST /auth/logout: advisory; clients discard the token
// - POST /auth/password-reset: issue a reset token
// - POST /auth/password-reset/confirm: consume a token, set a new password
//
// ============================================================================

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::context::AppContext;
use crate::error::AppError;
use crate::roles::Role;
use crate::routes::extractors::AuthenticatedUser;
use crate::users::{self, User};

const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetConfirm {
    pub token: String,
    pub new_password: String,
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') || email.len() > 320 {
        return Err(AppError::validation("A valid email address is required"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

pub async fn signup(
    State(ctx): State<Arc<AppContext>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_email(&req.email)?;
    validate_password(&req.password)?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Name is required"));
    }
    // Admin accounts are provisioned out of band, never self-registered.
    if req.role == Role::Admin {
        return Err(AppError::forbidden("Cannot self-register as admin"));
    }

    let email = req.email.trim().to_lowercase();
    let user = users::create_user(&ctx.db_pool, &email, &req.password, name, req.role).await?;

    let (token, _jti, expires_in) = ctx.auth_manager.create_token(&user.id)?;

    tracing::info!(user_id = %user.id, role = %user.role, "New account registered");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            access_token: token,
            expires_in,
            user,
        }),
    ))
}

pub async fn login(
    State(ctx): State<Arc<AppContext>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    let email = req.email.trim().to_lowercase();
    let user = users::get_user_by_email(&ctx.db_pool, &email)
        .await?
        .ok_or_else(|| AppError::auth("Invalid email or password"))?;

    if !users::verify_password(&user, &req.password)? {
        tracing::warn!(user_id = %user.id, "Failed login attempt");
        return Err(AppError::auth("Invalid email or password"));
    }

    let (token, _jti, expires_in) = ctx.auth_manager.create_token(&user.id)?;

    Ok(Json(AuthResponse {
        access_token: token,
        expires_in,
        user,
    }))
}

/// Stateless tokens cannot be revoked server-side; logout exists so clients
/// have a uniform endpoint to call before discarding their token.
pub async fn logout(AuthenticatedUser(user_id): AuthenticatedUser) -> impl IntoResponse {
    tracing::info!(user_id = %user_id, "User logged out");
    Json(serde_json::json!({ "status": "logged_out" }))
}

/// Always answers 200 so the endpoint does not confirm which emails exist.
pub async fn request_password_reset(
    State(ctx): State<Arc<AppContext>>,
    Json(req): Json<PasswordResetRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = req.email.trim().to_lowercase();

    if let Some(user) = users::get_user_by_email(&ctx.db_pool, &email).await? {
        let token = users::create_password_reset_token(
            &ctx.db_pool,
            &user.id,
            ctx.config.reset_token_ttl_hours,
        )
        .await?;
        // Mail delivery is out of scope; the token is surfaced in the logs
        // for the operator to forward.
        tracing::info!(user_id = %user.id, reset_token = %token, "Password reset token issued");
    } else {
        tracing::debug!("Password reset requested for unknown email");
    }

    Ok(Json(serde_json::json!({
        "status": "ok",
        "message": "If that email is registered, a reset link has been sent."
    })))
}

pub async fn confirm_password_reset(
    State(ctx): State<Arc<AppContext>>,
    Json(req): Json<PasswordResetConfirm>,
) -> Result<impl IntoResponse, AppError> {
    validate_password(&req.new_password)?;

    let user_id = users::consume_password_reset_token(&ctx.db_pool, &req.token)
        .await?
        .ok_or_else(|| AppError::auth("Invalid or expired reset token"))?;

    users::update_user_password(&ctx.db_pool, &user_id, &req.new_password).await?;

    tracing::info!(user_id = %user_id, "Password reset completed");

    Ok(Json(serde_json::json!({ "status": "password_updated" })))
}

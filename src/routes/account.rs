// ============================================================================
// Account Routes
// ============================================================================
//
// - GET /account: fetch the caller's profile
// - PATCH /account: update display name
// - PUT /account/photo: upload a profile photo (raw image body)
// - DELETE /account: delete the account after password re-authentication
//
// ============================================================================

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::config::MAX_PHOTO_SIZE;
use crate::context::AppContext;
use crate::error::AppError;
use crate::routes::extractors::CurrentUser;
use crate::storage::ObjectStorage;
use crate::users;

#[derive(Debug, Deserialize)]
pub struct UpdateAccountRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteAccountRequest {
    pub password: String,
}

pub async fn get_account(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(user)
}

pub async fn update_account(
    State(ctx): State<Arc<AppContext>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<UpdateAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Name cannot be empty"));
    }

    let updated = users::update_user_name(&ctx.db_pool, &user.id, name).await?;
    Ok(Json(updated))
}

pub async fn upload_photo(
    State(ctx): State<Arc<AppContext>>,
    CurrentUser(user): CurrentUser,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    if body.is_empty() {
        return Err(AppError::validation("Photo body is empty"));
    }
    if body.len() > MAX_PHOTO_SIZE {
        return Err(AppError::validation(format!(
            "Photo exceeds the maximum size of {} bytes",
            MAX_PHOTO_SIZE
        )));
    }

    let path = ObjectStorage::profile_photo_path(&user.id);
    let url = ctx.storage.put(&path, &body).await?;
    let updated = users::update_user_photo_url(&ctx.db_pool, &user.id, &url).await?;

    tracing::info!(user_id = %user.id, bytes = body.len(), "Profile photo updated");

    Ok(Json(updated))
}

pub async fn delete_account(
    State(ctx): State<Arc<AppContext>>,
    CurrentUser(user): CurrentUser,
    Json(req): Json<DeleteAccountRequest>,
) -> Result<impl IntoResponse, AppError> {
    // Destructive operation; require the password again even with a valid
    // token.
    if !users::verify_password(&user, &req.password)? {
        return Err(AppError::auth("Password is incorrect"));
    }

    users::delete_user(&ctx.db_pool, &user.id).await?;

    // Best effort; a stale photo on disk is harmless once the row is gone.
    let photo_path = ObjectStorage::profile_photo_path(&user.id);
    if let Err(e) = ctx.storage.delete(&photo_path).await {
        tracing::warn!(user_id = %user.id, error = %e, "Failed to remove profile photo");
    }

    tracing::info!(user_id = %user.id, "Account deleted");

    Ok(StatusCode::NO_CONTENT)
}

use bcrypt::{hash, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::roles::Role;

/// An authenticated account. `role` is immutable after signup.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub role: Role,
    pub photo_url: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub async fn create_user(
    pool: &DbPool,
    email: &str,
    password: &str,
    name: &str,
    role: Role,
) -> AppResult<User> {
    let password_hash = hash(password, DEFAULT_COST)?;
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password_hash, name, role)
        VALUES ($1, $2, $3, $4)
        RETURNING id, email, password_hash, name, role, photo_url, phone_number, created_at
        "#,
    )
    .bind(email)
    .bind(password_hash)
    .bind(name)
    .bind(role.as_str())
    .fetch_one(pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::validation(
            "This email is already in use. Please log in or use a different email.",
        ),
        _ => AppError::Database(e),
    })?;

    Ok(user)
}

pub async fn get_user_by_email(pool: &DbPool, email: &str) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password_hash, name, role, photo_url, phone_number, created_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub async fn get_user_by_id(pool: &DbPool, user_id: &Uuid) -> AppResult<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, email, password_hash, name, role, photo_url, phone_number, created_at
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

pub fn verify_password(user: &User, password: &str) -> AppResult<bool> {
    Ok(bcrypt::verify(password, &user.password_hash)?)
}

pub async fn update_user_name(pool: &DbPool, user_id: &Uuid, new_name: &str) -> AppResult<User> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET name = $1 WHERE id = $2
        RETURNING id, email, password_hash, name, role, photo_url, phone_number, created_at
        "#,
    )
    .bind(new_name)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(user)
}

pub async fn update_user_photo_url(
    pool: &DbPool,
    user_id: &Uuid,
    photo_url: &str,
) -> AppResult<User> {
    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET photo_url = $1 WHERE id = $2
        RETURNING id, email, password_hash, name, role, photo_url, phone_number, created_at
        "#,
    )
    .bind(photo_url)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::not_found("User not found"))?;
    Ok(user)
}

pub async fn update_user_password(
    pool: &DbPool,
    user_id: &Uuid,
    new_password: &str,
) -> AppResult<()> {
    let new_password_hash = hash(new_password, DEFAULT_COST)?;
    sqlx::query("UPDATE users SET password_hash = $1 WHERE id = $2")
        .bind(new_password_hash)
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete_user(pool: &DbPool, user_id: &Uuid) -> AppResult<()> {
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

// ============================================================================
// Password reset tokens
// ============================================================================

/// Only a SHA-256 digest of the reset token is stored; the raw token is
/// handed off to the mailer and never persisted.
pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub async fn create_password_reset_token(
    pool: &DbPool,
    user_id: &Uuid,
    ttl_hours: i64,
) -> AppResult<String> {
    let token = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::hours(ttl_hours);

    sqlx::query(
        r#"
        INSERT INTO password_reset_tokens (token_hash, user_id, expires_at)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(hash_reset_token(&token))
    .bind(user_id)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(token)
}

/// Redeem a reset token: single use, expiry enforced by the delete guard.
/// Returns the owning user id, or None if the token is unknown or stale.
pub async fn consume_password_reset_token(
    pool: &DbPool,
    token: &str,
) -> AppResult<Option<Uuid>> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        DELETE FROM password_reset_tokens
        WHERE token_hash = $1 AND expires_at > NOW()
        RETURNING user_id
        "#,
    )
    .bind(hash_reset_token(token))
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(user_id,)| user_id))
}

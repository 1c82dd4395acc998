// ============================================================================
// Axum Extractors
// ============================================================================
//
// - AuthenticatedUser: validates the bearer token and yields the user id
// - CurrentUser: additionally loads the account row, so handlers get the
//   actor's role without re-fetching
//
// ============================================================================

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AuthManager;
use crate::context::AppContext;
use crate::error::AppError;
use crate::users::{self, User};

/// Extractor for the authenticated user id from the JWT bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Uuid);

#[async_trait]
impl FromRequestParts<Arc<AppContext>> for AuthenticatedUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppContext>,
    ) -> Result<Self, Self::Rejection> {
        let user_id = extract_user_id_from_jwt(&state.auth_manager, parts).map_err(|e| {
            tracing::warn!(error = %e, "JWT authentication failed");
            e.into_response()
        })?;
        Ok(AuthenticatedUser(user_id))
    }
}

/// The acting account, loaded from the store. Every role gate takes this
/// explicitly; there is no ambient "current session" anywhere else.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<Arc<AppContext>> for CurrentUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppContext>,
    ) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(user_id) =
            AuthenticatedUser::from_request_parts(parts, state).await?;

        let user = users::get_user_by_id(&state.db_pool, &user_id)
            .await
            .map_err(|e| e.into_response())?
            .ok_or_else(|| {
                // Token is valid but the account row is gone (e.g. deleted
                // account with a still-live token).
                AppError::auth("Account no longer exists").into_response()
            })?;

        Ok(CurrentUser(user))
    }
}

fn extract_user_id_from_jwt(auth_manager: &AuthManager, parts: &Parts) -> Result<Uuid, AppError> {
    let auth_header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::auth("Missing Authorization header"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::auth("Invalid Authorization header format"))?;

    let claims = auth_manager
        .verify_token(token)
        .map_err(|e| AppError::auth(format!("Invalid or expired token: {}", e)))?;

    // A well-signed token whose subject is not a user id is still a bad
    // credential, not a bad request.
    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::auth("Token subject is not a valid user id"))?;
    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use chrono::{Duration, Utc};

    use crate::auth::Claims;
    use crate::config::{Config, DbConfig, TipServiceConfig};

    const TEST_SECRET: &str = "a1b2c3d4e5f6g7h8i9j0k1l2m3n4o5p6q7r8s9t0";

    fn test_auth_manager() -> AuthManager {
        AuthManager::new(&Config {
            database_url: String::new(),
            port: 8080,
            jwt_secret: TEST_SECRET.to_string(),
            jwt_issuer: "zerowaste-test".to_string(),
            access_token_ttl_hours: 1,
            reset_token_ttl_hours: 2,
            storage_dir: "./storage".into(),
            public_base_url: "http://localhost:8080".to_string(),
            rust_log: "info".to_string(),
            db: DbConfig {
                max_connections: 1,
                acquire_timeout_secs: 5,
            },
            tips: TipServiceConfig {
                endpoint: String::new(),
                api_key: None,
                timeout_secs: 5,
            },
        })
    }

    fn parts_with_bearer(token: &str) -> Parts {
        Request::builder()
            .header(AUTHORIZATION, format!("Bearer {}", token))
            .body(())
            .unwrap()
            .into_parts()
            .0
    }

    #[test]
    fn well_signed_token_with_garbage_subject_is_unauthorized() {
        let manager = test_auth_manager();
        let now = Utc::now();
        let claims = Claims {
            sub: "not-a-user-id".to_string(),
            jti: Uuid::new_v4().to_string(),
            exp: (now + Duration::hours(1)).timestamp(),
            iat: now.timestamp(),
            iss: "zerowaste-test".to_string(),
        };
        let token = jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
            &claims,
            &jsonwebtoken::EncodingKey::from_secret(TEST_SECRET.as_bytes()),
        )
        .unwrap();

        let parts = parts_with_bearer(&token);
        let err = extract_user_id_from_jwt(&manager, &parts).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn valid_token_yields_the_user_id() {
        let manager = test_auth_manager();
        let user_id = Uuid::new_v4();
        let (token, _, _) = manager.create_token(&user_id).unwrap();

        let parts = parts_with_bearer(&token);
        assert_eq!(extract_user_id_from_jwt(&manager, &parts).unwrap(), user_id);
    }

    #[test]
    fn missing_or_malformed_header_is_unauthorized() {
        let manager = test_auth_manager();

        let no_header = Request::builder().body(()).unwrap().into_parts().0;
        let err = extract_user_id_from_jwt(&manager, &no_header).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let wrong_scheme = Request::builder()
            .header(AUTHORIZATION, "Basic abc123")
            .body(())
            .unwrap()
            .into_parts()
            .0;
        let err = extract_user_id_from_jwt(&manager, &wrong_scheme).unwrap_err();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }
}

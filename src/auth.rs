use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::Config;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub jti: String, // JWT ID (unique per token)
    pub exp: i64,    // Expiration time
    pub iat: i64,    // Issued at
    pub iss: String, // Issuer
}

/// Issues and verifies HS256 access tokens for authenticated sessions.
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_ttl_hours: i64,
    issuer: String,
}

impl AuthManager {
    pub fn new(config: &Config) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_token_ttl_hours: config.access_token_ttl_hours,
            issuer: config.jwt_issuer.clone(),
        }
    }

    /// Create an access token. Returns (token, jti, expires_at).
    pub fn create_token(&self, user_id: &Uuid) -> Result<(String, String, i64)> {
        let now = Utc::now();
        let exp = now + Duration::hours(self.access_token_ttl_hours);
        let jti = Uuid::new_v4().to_string();

        let claims = Claims {
            sub: user_id.to_string(),
            jti: jti.clone(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .context("Failed to encode JWT token")?;

        Ok((token, jti, exp.timestamp()))
    }

    /// Verify a token's signature, expiry and issuer.
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.clone()]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation)
            .context("Token verification failed")?;
        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DbConfig, TipServiceConfig};

    fn test_config() -> Config {
        Config {
            database_url: String::new(),
            port: 8080,
            jwt_secret: "a1b2c3d4e5f6g7h8i9j0k1l2m3n4o5p6q7r8s9t0".to_string(),
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
        }
    }

    #[test]
    fn token_round_trip() {
        let manager = AuthManager::new(&test_config());
        let user_id = Uuid::new_v4();

        let (token, jti, expires_at) = manager.create_token(&user_id).unwrap();
        let claims = manager.verify_token(&token).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.jti, jti);
        assert_eq!(claims.exp, expires_at);
        assert_eq!(claims.iss, "zerowaste-test");
    }

    #[test]
    fn rejects_token_from_other_issuer() {
        let manager = AuthManager::new(&test_config());
        let mut other_config = test_config();
        other_config.jwt_issuer = "someone-else".to_string();
        let other = AuthManager::new(&other_config);

        let (token, _, _) = other.create_token(&Uuid::new_v4()).unwrap();
        assert!(manager.verify_token(&token).is_err());
    }

    #[test]
    fn rejects_tampered_token() {
        let manager = AuthManager::new(&test_config());
        let (token, _, _) = manager.create_token(&Uuid::new_v4()).unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('A') { 'B' } else { 'A' });
        assert!(manager.verify_token(&tampered).is_err());
    }
}

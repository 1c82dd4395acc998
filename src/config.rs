use anyhow::Result;
use std::path::PathBuf;

// ============================================================================
// Configuration Constants
// ============================================================================

const DEFAULT_PORT: u16 = 8080;

const DEFAULT_ACCESS_TOKEN_TTL_HOURS: i64 = 24;
const DEFAULT_RESET_TOKEN_TTL_HOURS: i64 = 2;

const DEFAULT_STORAGE_DIR: &str = "./storage";
const DEFAULT_PUBLIC_BASE_URL: &str = "http://localhost:8080";

// Upload limits (in bytes)
pub const MAX_REQUEST_BODY_SIZE: usize = 2 * 1024 * 1024; // 2 MB - JSON API requests
pub const MAX_PHOTO_SIZE: usize = 5 * 1024 * 1024; // 5 MB - profile photos

/// Safety cap on unbounded list queries. The product has no pagination
/// contract yet; this keeps a runaway collection from flooding a response.
pub const MAX_LIST_ROWS: i64 = 500;

// ============================================================================
// Configuration Structures
// ============================================================================

/// Database connection pool configuration
#[derive(Clone, Debug)]
pub struct DbConfig {
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Timeout for acquiring a connection from the pool (seconds)
    pub acquire_timeout_secs: u64,
}

/// Generative tip service configuration
#[derive(Clone, Debug)]
pub struct TipServiceConfig {
    /// Endpoint of the hosted model that turns a food item into a tip.
    /// Empty string disables the feature (requests get a 502).
    pub endpoint: String,
    /// Optional bearer token for the hosted model
    pub api_key: Option<String>,
    /// Request timeout (seconds)
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Symmetric secret for HS256 access tokens
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub access_token_ttl_hours: i64,
    pub reset_token_ttl_hours: i64,
    /// Root directory of the local object store (listing photos, avatars)
    pub storage_dir: PathBuf,
    /// Base URL under which stored objects are reachable
    pub public_base_url: String,
    pub rust_log: String,
    pub db: DbConfig,
    pub tips: TipServiceConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = std::env::var("JWT_SECRET")?;
        if jwt_secret.len() < 32 {
            anyhow::bail!(
                "JWT_SECRET must be at least 32 characters long. \
                Generate one with: openssl rand -base64 32"
            );
        }

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")?,
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            jwt_secret,
            jwt_issuer: std::env::var("JWT_ISSUER")
                .unwrap_or_else(|_| "zerowaste-connect".to_string()),
            access_token_ttl_hours: std::env::var("ACCESS_TOKEN_TTL_HOURS")
                .ok()
                .and_then(|h| h.parse().ok())
                .unwrap_or(DEFAULT_ACCESS_TOKEN_TTL_HOURS),
            reset_token_ttl_hours: std::env::var("RESET_TOKEN_TTL_HOURS")
                .ok()
                .and_then(|h| h.parse().ok())
                .unwrap_or(DEFAULT_RESET_TOKEN_TTL_HOURS),
            storage_dir: std::env::var("STORAGE_DIR")
                .unwrap_or_else(|_| DEFAULT_STORAGE_DIR.to_string())
                .into(),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_PUBLIC_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            db: DbConfig {
                max_connections: std::env::var("DB_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(5),
                acquire_timeout_secs: std::env::var("DB_ACQUIRE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(10),
            },
            tips: TipServiceConfig {
                endpoint: std::env::var("TIP_SERVICE_URL").unwrap_or_default(),
                api_key: std::env::var("TIP_SERVICE_API_KEY").ok(),
                timeout_secs: std::env::var("TIP_SERVICE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(20),
            },
        })
    }
}

use std::sync::Arc;

use crate::auth::AuthManager;
use crate::config::Config;
use crate::db::DbPool;
use crate::storage::ObjectStorage;
use crate::tips::TipClient;

/// Application context containing shared dependencies. Handlers receive it
/// through axum state; nothing reads session or actor identity from globals.
#[derive(Clone)]
pub struct AppContext {
    pub db_pool: Arc<DbPool>,
    pub auth_manager: Arc<AuthManager>,
    pub config: Arc<Config>,
    pub storage: Arc<ObjectStorage>,
    pub tips: Arc<TipClient>,
}

impl AppContext {
    pub fn new(
        db_pool: Arc<DbPool>,
        auth_manager: Arc<AuthManager>,
        config: Arc<Config>,
        storage: Arc<ObjectStorage>,
        tips: Arc<TipClient>,
    ) -> Self {
        Self {
            db_pool,
            auth_manager,
            config,
            storage,
            tips,
        }
    }
}

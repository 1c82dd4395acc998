// ============================================================================
// Health & Metrics Routes
// ============================================================================

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use std::sync::Arc;

use crate::context::AppContext;
use crate::metrics;

pub async fn health_check(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    let db_ok = sqlx::query("SELECT 1")
        .execute(&*ctx.db_pool)
        .await
        .is_ok();

    let status = if db_ok { "ok" } else { "degraded" };
    let code = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(serde_json::json!({
            "status": status,
            "service": "zerowaste-connect",
            "database": if db_ok { "up" } else { "down" },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::gather_metrics() {
        Ok(body) => (StatusCode::OK, body),
        Err(e) => {
            tracing::error!(error = %e, "Failed to gather metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "failed to gather metrics".to_string(),
            )
        }
    }
}

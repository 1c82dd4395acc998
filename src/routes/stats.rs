// ============================================================================
// Impact Statistics Routes
// ============================================================================

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::context::AppContext;
use crate::error::AppError;
use crate::stats::{self, ImpactStats};

/// Public by design, so this handler takes no authenticated user.
pub async fn impact_stats(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<ImpactStats>, AppError> {
    let stats = stats::impact_stats(&ctx.db_pool).await?;
    Ok(Json(stats))
}

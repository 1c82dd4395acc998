// ============================================================================
// Food Tip Routes
// ============================================================================

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::context::AppContext;
use crate::error::AppError;
use crate::metrics::TIPS_GENERATED_TOTAL;
use crate::routes::extractors::CurrentUser;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTipRequest {
    pub food_item: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateTipResponse {
    pub tip: String,
}

/// Turn a food item name into a short storage-and-handling tip via the
/// hosted model.
pub async fn generate_tip(
    State(ctx): State<Arc<AppContext>>,
    CurrentUser(_user): CurrentUser,
    Json(req): Json<GenerateTipRequest>,
) -> Result<Json<GenerateTipResponse>, AppError> {
    let food_item = req.food_item.trim();
    if food_item.is_empty() {
        return Err(AppError::validation("foodItem is required"));
    }

    let tip = ctx.tips.generate(food_item).await?;
    TIPS_GENERATED_TOTAL.inc();

    Ok(Json(GenerateTipResponse { tip }))
}

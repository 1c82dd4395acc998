// ============================================================================
// Delivery Routes
// ============================================================================
//
// - GET /deliveries/pending: volunteers browse the open pickup queue
// - POST /deliveries/:id/accept: a volunteer takes a pickup
//
// ============================================================================

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::context::AppContext;
use crate::deliveries::{self, DeliveryRequest};
use crate::error::AppError;
use crate::metrics::DELIVERIES_ACCEPTED_TOTAL;
use crate::roles;
use crate::routes::extractors::CurrentUser;

pub async fn pending_deliveries(
    State(ctx): State<Arc<AppContext>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<DeliveryRequest>>, AppError> {
    roles::ensure_can_accept_delivery(user.role)?;

    let requests = deliveries::pending_requests(&ctx.db_pool).await?;
    Ok(Json(requests))
}

pub async fn accept_delivery(
    State(ctx): State<Arc<AppContext>>,
    CurrentUser(user): CurrentUser,
    Path(request_id): Path<Uuid>,
) -> Result<Json<DeliveryRequest>, AppError> {
    roles::ensure_can_accept_delivery(user.role)?;

    let request = deliveries::accept_request(&ctx.db_pool, &request_id, &user).await?;
    DELIVERIES_ACCEPTED_TOTAL.inc();

    Ok(Json(request))
}

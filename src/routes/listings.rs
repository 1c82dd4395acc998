// ============================================================================
// Listing Routes
// ============================================================================
//
// - POST /listings: donors post surplus food
// - GET /listings: recipients browse open listings
// - GET /listings/mine: donors review their own history
// - POST /listings/:id/claim: recipients claim for self-pickup
// - POST /listings/:id/request-delivery: recipients ask for a courier
//
// ============================================================================

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::context::AppContext;
use crate::deliveries::{self, DeliveryRequest};
use crate::error::AppError;
use crate::listings::{self, Listing, NewListing};
use crate::metrics::{LISTINGS_CLAIMED_TOTAL, LISTINGS_CREATED_TOTAL};
use crate::roles;
use crate::routes::extractors::CurrentUser;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRequestedResponse {
    pub listing: Listing,
    pub delivery_request: DeliveryRequest,
}

pub async fn create_listing(
    State(ctx): State<Arc<AppContext>>,
    CurrentUser(user): CurrentUser,
    Json(new): Json<NewListing>,
) -> Result<impl IntoResponse, AppError> {
    roles::ensure_can_create_listing(user.role)?;

    let listing = listings::create_listing(&ctx.db_pool, &user, &new).await?;
    LISTINGS_CREATED_TOTAL.inc();

    Ok((StatusCode::CREATED, Json(listing)))
}

pub async fn browse_listings(
    State(ctx): State<Arc<AppContext>>,
    CurrentUser(_user): CurrentUser,
) -> Result<Json<Vec<Listing>>, AppError> {
    let listings = listings::browse_open_listings(&ctx.db_pool).await?;
    Ok(Json(listings))
}

pub async fn my_listings(
    State(ctx): State<Arc<AppContext>>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<Listing>>, AppError> {
    roles::require_role(user.role, roles::Role::Donor, "view donation history")?;

    let listings = listings::listings_by_donor(&ctx.db_pool, &user.id).await?;
    Ok(Json(listings))
}

pub async fn claim_listing(
    State(ctx): State<Arc<AppContext>>,
    CurrentUser(user): CurrentUser,
    Path(listing_id): Path<Uuid>,
) -> Result<Json<Listing>, AppError> {
    roles::ensure_can_claim_listing(user.role)?;

    let listing = listings::claim_self_pickup(&ctx.db_pool, &listing_id, &user).await?;
    LISTINGS_CLAIMED_TOTAL.inc();

    Ok(Json(listing))
}

pub async fn request_delivery(
    State(ctx): State<Arc<AppContext>>,
    CurrentUser(user): CurrentUser,
    Path(listing_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    roles::ensure_can_claim_listing(user.role)?;

    let (listing, request) =
        deliveries::request_delivery(&ctx.db_pool, &listing_id, &user).await?;
    LISTINGS_CLAIMED_TOTAL.inc();

    Ok((
        StatusCode::CREATED,
        Json(DeliveryRequestedResponse {
            listing,
            delivery_request: request,
        }),
    ))
}

// ============================================================================
// Delivery Request Coordinator
// ============================================================================
//
// Manages the one-to-one relationship between a delivery request and its
// parent listing. The two paired writes the product depends on (creating
// a request while moving the listing to `delivery_requested`, and accepting
// a request while moving the listing to `volunteer_assigned`) each run in
// a single database transaction so no observable state has one side updated
// and not the other.
//
// ============================================================================

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::config::MAX_LIST_ROWS;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::listings::Listing;
use crate::users::User;

/// Delivery request lifecycle status.
///
/// Only `PendingVolunteerAssignment` and `AssignedToVolunteer` are produced
/// by the current transitions. The remaining statuses are reachable in the
/// type system for forward compatibility with courier progress tracking and
/// cancellations, but nothing sets them yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    PendingVolunteerAssignment,
    AssignedToVolunteer,
    PickupInProgress,
    DeliveryInProgress,
    Delivered,
    CancelledByRecipient,
    CancelledByVolunteer,
    CancelledByDonor,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::PendingVolunteerAssignment => "pending_volunteer_assignment",
            DeliveryStatus::AssignedToVolunteer => "assigned_to_volunteer",
            DeliveryStatus::PickupInProgress => "pickup_in_progress",
            DeliveryStatus::DeliveryInProgress => "delivery_in_progress",
            DeliveryStatus::Delivered => "delivered",
            DeliveryStatus::CancelledByRecipient => "cancelled_by_recipient",
            DeliveryStatus::CancelledByVolunteer => "cancelled_by_volunteer",
            DeliveryStatus::CancelledByDonor => "cancelled_by_donor",
        }
    }
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending_volunteer_assignment" => Ok(DeliveryStatus::PendingVolunteerAssignment),
            "assigned_to_volunteer" => Ok(DeliveryStatus::AssignedToVolunteer),
            "pickup_in_progress" => Ok(DeliveryStatus::PickupInProgress),
            "delivery_in_progress" => Ok(DeliveryStatus::DeliveryInProgress),
            "delivered" => Ok(DeliveryStatus::Delivered),
            "cancelled_by_recipient" => Ok(DeliveryStatus::CancelledByRecipient),
            "cancelled_by_volunteer" => Ok(DeliveryStatus::CancelledByVolunteer),
            "cancelled_by_donor" => Ok(DeliveryStatus::CancelledByDonor),
            other => Err(AppError::validation(format!(
                "Unknown delivery status: {}",
                other
            ))),
        }
    }
}

impl sqlx::Type<sqlx::Postgres> for DeliveryStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for DeliveryStatus {
    fn decode(
        value: sqlx::postgres::PgValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        Ok(s.parse()?)
    }
}

/// A volunteer-fulfillment task derived from a listing. Donor and pickup
/// fields are a snapshot taken at request time, not a live reference.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryRequest {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub donor_id: Uuid,
    pub donor_name: Option<String>,
    pub food_type: String,
    pub quantity: String,
    pub pickup_location: String,
    pub pickup_latitude: Option<f64>,
    pub pickup_longitude: Option<f64>,
    pub pickup_instructions: Option<String>,
    pub recipient_id: Uuid,
    pub recipient_name: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub status: DeliveryStatus,
    pub assigned_volunteer_id: Option<Uuid>,
    pub assigned_volunteer_name: Option<String>,
    pub assigned_at: Option<DateTime<Utc>>,
}

const REQUEST_COLUMNS: &str = "id, listing_id, donor_id, donor_name, food_type, quantity, \
     pickup_location, pickup_latitude, pickup_longitude, pickup_instructions, \
     recipient_id, recipient_name, requested_at, status, \
     assigned_volunteer_id, assigned_volunteer_name, assigned_at";

/// Create a delivery request for a listing. One transaction covers the
/// listing's conditional transition to `delivery_requested` (which also
/// stamps the claim metadata) and the insert of the request snapshot, so
/// a listing can spawn at most one live request.
pub async fn request_delivery(
    pool: &DbPool,
    listing_id: &Uuid,
    recipient: &User,
) -> AppResult<(Listing, DeliveryRequest)> {
    let mut tx = pool.begin().await?;

    let listing = sqlx::query_as::<_, Listing>(
        r#"
        UPDATE food_listings
        SET status = 'delivery_requested',
            claimed_by = $2,
            claimed_at = NOW(),
            claim_type = 'volunteer-delivery'
        WHERE id = $1 AND status IN ('available', 'requested')
        RETURNING id, donor_id, donor_name, food_type, quantity, location,
                  latitude, longitude, pickup_instructions, image_url, expiry_date,
                  posted_at, status, claimed_by, claimed_at, claim_type
        "#,
    )
    .bind(listing_id)
    .bind(recipient.id)
    .fetch_optional(&mut *tx)
    .await?;

    let listing = match listing {
        Some(listing) => listing,
        None => {
            tx.rollback().await?;
            return if crate::listings::get_listing(pool, listing_id).await?.is_none() {
                Err(AppError::not_found("Listing not found"))
            } else {
                Err(AppError::conflict("This listing is no longer available"))
            };
        }
    };

    let request = sqlx::query_as::<_, DeliveryRequest>(&format!(
        r#"
        INSERT INTO delivery_requests
            (listing_id, donor_id, donor_name, food_type, quantity,
             pickup_location, pickup_latitude, pickup_longitude, pickup_instructions,
             recipient_id, recipient_name)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {REQUEST_COLUMNS}
        "#
    ))
    .bind(listing.id)
    .bind(listing.donor_id)
    .bind(listing.donor_name.as_deref())
    .bind(&listing.food_type)
    .bind(&listing.quantity)
    .bind(&listing.location)
    .bind(listing.latitude)
    .bind(listing.longitude)
    .bind(listing.pickup_instructions.as_deref())
    .bind(recipient.id)
    .bind(&recipient.name)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        listing_id = %listing.id,
        request_id = %request.id,
        recipient_id = %recipient.id,
        "Volunteer delivery requested"
    );

    Ok((listing, request))
}

/// All requests a volunteer can pick up, oldest first: the recipient who
/// asked first is served first.
pub async fn pending_requests(pool: &DbPool) -> AppResult<Vec<DeliveryRequest>> {
    let requests = sqlx::query_as::<_, DeliveryRequest>(&format!(
        r#"
        SELECT {REQUEST_COLUMNS}
        FROM delivery_requests
        WHERE status = 'pending_volunteer_assignment'
        ORDER BY requested_at ASC
        LIMIT $1
        "#
    ))
    .bind(MAX_LIST_ROWS)
    .fetch_all(pool)
    .await?;

    Ok(requests)
}

pub async fn get_request(pool: &DbPool, request_id: &Uuid) -> AppResult<Option<DeliveryRequest>> {
    let request = sqlx::query_as::<_, DeliveryRequest>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM delivery_requests WHERE id = $1"
    ))
    .bind(request_id)
    .fetch_optional(pool)
    .await?;

    Ok(request)
}

/// Volunteer accepts a pending request. The request's conditional
/// transition and the parent listing's move to `volunteer_assigned` commit
/// together or not at all. A request that already left
/// `pending_volunteer_assignment` yields an `ALREADY_HANDLED` conflict and
/// the caller is expected to refresh its view.
pub async fn accept_request(
    pool: &DbPool,
    request_id: &Uuid,
    volunteer: &User,
) -> AppResult<DeliveryRequest> {
    let mut tx = pool.begin().await?;

    let request = sqlx::query_as::<_, DeliveryRequest>(&format!(
        r#"
        UPDATE delivery_requests
        SET status = 'assigned_to_volunteer',
            assigned_volunteer_id = $2,
            assigned_volunteer_name = $3,
            assigned_at = NOW()
        WHERE id = $1 AND status = 'pending_volunteer_assignment'
        RETURNING {REQUEST_COLUMNS}
        "#
    ))
    .bind(request_id)
    .bind(volunteer.id)
    .bind(&volunteer.name)
    .fetch_optional(&mut *tx)
    .await?;

    let request = match request {
        Some(request) => request,
        None => {
            tx.rollback().await?;
            return if get_request(pool, request_id).await?.is_none() {
                Err(AppError::not_found("Delivery request not found"))
            } else {
                Err(AppError::conflict(
                    "This pickup request is no longer pending",
                ))
            };
        }
    };

    let listing_update = sqlx::query(
        r#"
        UPDATE food_listings
        SET status = 'volunteer_assigned'
        WHERE id = $1 AND status = 'delivery_requested'
        "#,
    )
    .bind(request.listing_id)
    .execute(&mut *tx)
    .await?;

    // Both sides transition or neither does. The listing can have left
    // `delivery_requested` (an operator marking it expired or fulfilled)
    // while the request still looked pending.
    if listing_update.rows_affected() != 1 {
        tx.rollback().await?;
        return Err(AppError::conflict(
            "The donation behind this pickup request is no longer available",
        ));
    }

    tx.commit().await?;

    tracing::info!(
        request_id = %request.id,
        listing_id = %request.listing_id,
        volunteer_id = %volunteer.id,
        "Delivery request accepted"
    );

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            DeliveryStatus::PendingVolunteerAssignment,
            DeliveryStatus::AssignedToVolunteer,
            DeliveryStatus::PickupInProgress,
            DeliveryStatus::DeliveryInProgress,
            DeliveryStatus::Delivered,
            DeliveryStatus::CancelledByRecipient,
            DeliveryStatus::CancelledByVolunteer,
            DeliveryStatus::CancelledByDonor,
        ] {
            assert_eq!(status.as_str().parse::<DeliveryStatus>().unwrap(), status);
        }
        assert!("lost_in_transit".parse::<DeliveryStatus>().is_err());
    }

    #[test]
    fn serializes_snake_case_for_the_api() {
        let json = serde_json::to_string(&DeliveryStatus::PendingVolunteerAssignment).unwrap();
        assert_eq!(json, "\"pending_volunteer_assignment\"");
    }
}

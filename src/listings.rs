// ============================================================================
// Listing Lifecycle Manager
// ============================================================================
//
// Owns the status transitions of a food listing from creation to terminal
// state. Every claim transition is a single conditional UPDATE guarded on
// the current status, so two racing recipients cannot both win: the store
// applies exactly one transition and the loser sees zero rows updated.
//
// ============================================================================

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::config::MAX_LIST_ROWS;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::users::User;

/// Listing lifecycle status.
///
/// `Fulfilled` and `Expired` are declared terminal states with no producing
/// transition in the current product; an operator or a future batch job
/// would set them. Expiry is otherwise a display-time concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Available,
    Requested,
    ClaimedByRecipient,
    DeliveryRequested,
    VolunteerAssigned,
    Fulfilled,
    Expired,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Available => "available",
            ListingStatus::Requested => "requested",
            ListingStatus::ClaimedByRecipient => "claimed_by_recipient",
            ListingStatus::DeliveryRequested => "delivery_requested",
            ListingStatus::VolunteerAssigned => "volunteer_assigned",
            ListingStatus::Fulfilled => "fulfilled",
            ListingStatus::Expired => "expired",
        }
    }

    /// Statuses from which a recipient may still claim the listing.
    pub const CLAIMABLE: [ListingStatus; 2] =
        [ListingStatus::Available, ListingStatus::Requested];
}

impl fmt::Display for ListingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListingStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(ListingStatus::Available),
            "requested" => Ok(ListingStatus::Requested),
            "claimed_by_recipient" => Ok(ListingStatus::ClaimedByRecipient),
            "delivery_requested" => Ok(ListingStatus::DeliveryRequested),
            "volunteer_assigned" => Ok(ListingStatus::VolunteerAssigned),
            "fulfilled" => Ok(ListingStatus::Fulfilled),
            "expired" => Ok(ListingStatus::Expired),
            other => Err(AppError::validation(format!(
                "Unknown listing status: {}",
                other
            ))),
        }
    }
}

impl sqlx::Type<sqlx::Postgres> for ListingStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ListingStatus {
    fn decode(
        value: sqlx::postgres::PgValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        Ok(s.parse()?)
    }
}

/// How a recipient committed to receive a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimType {
    #[serde(rename = "self-pickup")]
    SelfPickup,
    #[serde(rename = "volunteer-delivery")]
    VolunteerDelivery,
}

impl ClaimType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimType::SelfPickup => "self-pickup",
            ClaimType::VolunteerDelivery => "volunteer-delivery",
        }
    }
}

impl FromStr for ClaimType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "self-pickup" => Ok(ClaimType::SelfPickup),
            "volunteer-delivery" => Ok(ClaimType::VolunteerDelivery),
            other => Err(AppError::validation(format!(
                "Unknown claim type: {}",
                other
            ))),
        }
    }
}

impl sqlx::Type<sqlx::Postgres> for ClaimType {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ClaimType {
    fn decode(
        value: sqlx::postgres::PgValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        Ok(s.parse()?)
    }
}

/// A posted food donation.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: Uuid,
    pub donor_id: Uuid,
    pub donor_name: Option<String>,
    pub food_type: String,
    /// Free text such as "10 meals" or "5 kg"; never used for arithmetic.
    pub quantity: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub pickup_instructions: Option<String>,
    pub image_url: Option<String>,
    pub expiry_date: NaiveDate,
    pub posted_at: DateTime<Utc>,
    pub status: ListingStatus,
    pub claimed_by: Option<Uuid>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub claim_type: Option<ClaimType>,
}

const LISTING_COLUMNS: &str = "id, donor_id, donor_name, food_type, quantity, location, \
     latitude, longitude, pickup_instructions, image_url, expiry_date, posted_at, \
     status, claimed_by, claimed_at, claim_type";

/// Donor-supplied fields for a new listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewListing {
    pub food_type: String,
    pub quantity: String,
    pub location: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub pickup_instructions: Option<String>,
    pub image_url: Option<String>,
    pub expiry_date: NaiveDate,
}

impl NewListing {
    /// Reject incomplete or nonsensical submissions before persistence.
    pub fn validate(&self, today: NaiveDate) -> Result<(), AppError> {
        if self.food_type.trim().is_empty() {
            return Err(AppError::validation("Food type is required"));
        }
        if self.quantity.trim().is_empty() {
            return Err(AppError::validation("Quantity is required"));
        }
        if self.location.trim().is_empty() {
            return Err(AppError::validation("Pickup location is required"));
        }
        if self.expiry_date < today {
            return Err(AppError::validation(
                "Expiry date must not be in the past",
            ));
        }
        if let Some(lat) = self.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(AppError::validation("Latitude out of range"));
            }
        }
        if let Some(lon) = self.longitude {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(AppError::validation("Longitude out of range"));
            }
        }
        // A coordinate pair makes no sense half-specified.
        if self.latitude.is_some() != self.longitude.is_some() {
            return Err(AppError::validation(
                "Latitude and longitude must be provided together",
            ));
        }
        Ok(())
    }
}

/// Insert a new listing in `available` status. The caller has already
/// passed the role gate; validation runs here as the last line of defense.
pub async fn create_listing(pool: &DbPool, donor: &User, new: &NewListing) -> AppResult<Listing> {
    new.validate(Utc::now().date_naive())?;

    let listing = sqlx::query_as::<_, Listing>(&format!(
        r#"
        INSERT INTO food_listings
            (donor_id, donor_name, food_type, quantity, location, latitude, longitude,
             pickup_instructions, image_url, expiry_date)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {LISTING_COLUMNS}
        "#
    ))
    .bind(donor.id)
    .bind(&donor.name)
    .bind(new.food_type.trim())
    .bind(new.quantity.trim())
    .bind(new.location.trim())
    .bind(new.latitude)
    .bind(new.longitude)
    .bind(new.pickup_instructions.as_deref())
    .bind(new.image_url.as_deref())
    .bind(new.expiry_date)
    .fetch_one(pool)
    .await?;

    Ok(listing)
}

pub async fn get_listing(pool: &DbPool, listing_id: &Uuid) -> AppResult<Option<Listing>> {
    let listing = sqlx::query_as::<_, Listing>(&format!(
        "SELECT {LISTING_COLUMNS} FROM food_listings WHERE id = $1"
    ))
    .bind(listing_id)
    .fetch_optional(pool)
    .await?;

    Ok(listing)
}

/// General browse: listings still open for claiming, newest first.
pub async fn browse_open_listings(pool: &DbPool) -> AppResult<Vec<Listing>> {
    let listings = sqlx::query_as::<_, Listing>(&format!(
        r#"
        SELECT {LISTING_COLUMNS}
        FROM food_listings
        WHERE status IN ('available', 'requested')
        ORDER BY posted_at DESC
        LIMIT $1
        "#
    ))
    .bind(MAX_LIST_ROWS)
    .fetch_all(pool)
    .await?;

    Ok(listings)
}

/// Donor history: everything this donor ever posted, newest first.
pub async fn listings_by_donor(pool: &DbPool, donor_id: &Uuid) -> AppResult<Vec<Listing>> {
    let listings = sqlx::query_as::<_, Listing>(&format!(
        r#"
        SELECT {LISTING_COLUMNS}
        FROM food_listings
        WHERE donor_id = $1
        ORDER BY posted_at DESC
        LIMIT $2
        "#
    ))
    .bind(donor_id)
    .bind(MAX_LIST_ROWS)
    .fetch_all(pool)
    .await?;

    Ok(listings)
}

/// Self-pickup claim as one atomic conditional write: the status and claim
/// metadata change only if the listing is still claimable. Returns the
/// updated listing, or an `ALREADY_HANDLED` conflict when another recipient
/// got there first.
pub async fn claim_self_pickup(
    pool: &DbPool,
    listing_id: &Uuid,
    recipient: &User,
) -> AppResult<Listing> {
    let updated = sqlx::query_as::<_, Listing>(&format!(
        r#"
        UPDATE food_listings
        SET status = 'claimed_by_recipient',
            claimed_by = $2,
            claimed_at = NOW(),
            claim_type = 'self-pickup'
        WHERE id = $1 AND status IN ('available', 'requested')
        RETURNING {LISTING_COLUMNS}
        "#
    ))
    .bind(listing_id)
    .bind(recipient.id)
    .fetch_optional(pool)
    .await?;

    match updated {
        Some(listing) => {
            tracing::info!(
                listing_id = %listing.id,
                recipient_id = %recipient.id,
                "Listing claimed for self-pickup"
            );
            Ok(listing)
        }
        None => {
            // Distinguish "gone" from "taken" for a clearer message.
            if get_listing(pool, listing_id).await?.is_none() {
                Err(AppError::not_found("Listing not found"))
            } else {
                Err(AppError::conflict("This listing is no longer available"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Days;

    fn valid_listing() -> NewListing {
        NewListing {
            food_type: "Bread".to_string(),
            quantity: "3 boxes".to_string(),
            location: "Cafe X".to_string(),
            latitude: None,
            longitude: None,
            pickup_instructions: None,
            image_url: None,
            expiry_date: Utc::now().date_naive() + Days::new(1),
        }
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            ListingStatus::Available,
            ListingStatus::Requested,
            ListingStatus::ClaimedByRecipient,
            ListingStatus::DeliveryRequested,
            ListingStatus::VolunteerAssigned,
            ListingStatus::Fulfilled,
            ListingStatus::Expired,
        ] {
            assert_eq!(status.as_str().parse::<ListingStatus>().unwrap(), status);
        }
        assert!("reserved".parse::<ListingStatus>().is_err());
    }

    #[test]
    fn claimable_set_excludes_terminal_states() {
        assert!(ListingStatus::CLAIMABLE.contains(&ListingStatus::Available));
        assert!(ListingStatus::CLAIMABLE.contains(&ListingStatus::Requested));
        assert!(!ListingStatus::CLAIMABLE.contains(&ListingStatus::ClaimedByRecipient));
        assert!(!ListingStatus::CLAIMABLE.contains(&ListingStatus::Fulfilled));
    }

    #[test]
    fn claim_type_uses_hyphenated_wire_form() {
        assert_eq!(ClaimType::SelfPickup.as_str(), "self-pickup");
        assert_eq!(
            "volunteer-delivery".parse::<ClaimType>().unwrap(),
            ClaimType::VolunteerDelivery
        );
    }

    #[test]
    fn validate_accepts_complete_listing() {
        let today = Utc::now().date_naive();
        assert!(valid_listing().validate(today).is_ok());
    }

    #[test]
    fn validate_rejects_past_expiry() {
        let today = Utc::now().date_naive();
        let mut listing = valid_listing();
        listing.expiry_date = today - Days::new(1);
        assert!(listing.validate(today).is_err());
    }

    #[test]
    fn validate_allows_expiry_today() {
        let today = Utc::now().date_naive();
        let mut listing = valid_listing();
        listing.expiry_date = today;
        assert!(listing.validate(today).is_ok());
    }

    #[test]
    fn validate_rejects_blank_required_fields() {
        let today = Utc::now().date_naive();
        for field in ["food_type", "quantity", "location"] {
            let mut listing = valid_listing();
            match field {
                "food_type" => listing.food_type = "  ".to_string(),
                "quantity" => listing.quantity = String::new(),
                _ => listing.location = "\t".to_string(),
            }
            assert!(listing.validate(today).is_err(), "{} should be required", field);
        }
    }

    #[test]
    fn validate_rejects_half_specified_coordinates() {
        let today = Utc::now().date_naive();
        let mut listing = valid_listing();
        listing.latitude = Some(52.52);
        assert!(listing.validate(today).is_err());

        listing.longitude = Some(13.40);
        assert!(listing.validate(today).is_ok());

        listing.latitude = Some(123.0);
        assert!(listing.validate(today).is_err());
    }
}

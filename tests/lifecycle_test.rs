// End-to-end lifecycle tests for the listing and delivery state machines,
// run against a real Postgres database (see test_utils.rs).

mod test_utils;

use serial_test::serial;
use uuid::Uuid;

use test_utils::{create_test_user, sample_listing, setup_pool};
use zerowaste_connect::deliveries::{self, DeliveryStatus};
use zerowaste_connect::error::AppError;
use zerowaste_connect::listings::{self, ClaimType, ListingStatus};
use zerowaste_connect::roles::Role;
use zerowaste_connect::stats;
use zerowaste_connect::users;

#[tokio::test]
#[serial]
async fn self_pickup_claim_updates_listing() {
    let pool = setup_pool().await;
    let donor = create_test_user(&pool, Role::Donor).await;
    let recipient = create_test_user(&pool, Role::Recipient).await;

    let listing = listings::create_listing(&pool, &donor, &sample_listing())
        .await
        .unwrap();
    assert_eq!(listing.status, ListingStatus::Available);
    assert_eq!(listing.donor_name.as_deref(), Some("Test User"));
    assert!(listing.claimed_by.is_none());

    let claimed = listings::claim_self_pickup(&pool, &listing.id, &recipient)
        .await
        .unwrap();
    assert_eq!(claimed.status, ListingStatus::ClaimedByRecipient);
    assert_eq!(claimed.claimed_by, Some(recipient.id));
    assert_eq!(claimed.claim_type, Some(ClaimType::SelfPickup));
    assert!(claimed.claimed_at.is_some());
}

#[tokio::test]
#[serial]
async fn claiming_a_claimed_listing_conflicts() {
    let pool = setup_pool().await;
    let donor = create_test_user(&pool, Role::Donor).await;
    let first = create_test_user(&pool, Role::Recipient).await;
    let second = create_test_user(&pool, Role::Recipient).await;

    let listing = listings::create_listing(&pool, &donor, &sample_listing())
        .await
        .unwrap();
    listings::claim_self_pickup(&pool, &listing.id, &first)
        .await
        .unwrap();

    let err = listings::claim_self_pickup(&pool, &listing.id, &second)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {:?}", err);
    assert_eq!(err.error_code(), "ALREADY_HANDLED");

    // The first claim is untouched.
    let current = listings::get_listing(&pool, &listing.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.claimed_by, Some(first.id));
}

#[tokio::test]
#[serial]
async fn concurrent_claims_admit_exactly_one_winner() {
    let pool = setup_pool().await;
    let donor = create_test_user(&pool, Role::Donor).await;
    let first = create_test_user(&pool, Role::Recipient).await;
    let second = create_test_user(&pool, Role::Recipient).await;

    let listing = listings::create_listing(&pool, &donor, &sample_listing())
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        listings::claim_self_pickup(&pool, &listing.id, &first),
        listings::claim_self_pickup(&pool, &listing.id, &second),
    );

    let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1, "exactly one concurrent claim must win");

    let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert_eq!(loser.error_code(), "ALREADY_HANDLED");
}

#[tokio::test]
#[serial]
async fn claiming_unknown_listing_is_not_found() {
    let pool = setup_pool().await;
    let recipient = create_test_user(&pool, Role::Recipient).await;

    let err = listings::claim_self_pickup(&pool, &Uuid::new_v4(), &recipient)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {:?}", err);
}

#[tokio::test]
#[serial]
async fn delivery_request_and_accept_update_both_records() {
    let pool = setup_pool().await;
    let donor = create_test_user(&pool, Role::Donor).await;
    let recipient = create_test_user(&pool, Role::Recipient).await;
    let volunteer = create_test_user(&pool, Role::Volunteer).await;

    let listing = listings::create_listing(&pool, &donor, &sample_listing())
        .await
        .unwrap();

    let (listing, request) = deliveries::request_delivery(&pool, &listing.id, &recipient)
        .await
        .unwrap();
    assert_eq!(listing.status, ListingStatus::DeliveryRequested);
    assert_eq!(listing.claim_type, Some(ClaimType::VolunteerDelivery));
    assert_eq!(request.listing_id, listing.id);
    assert_eq!(request.status, DeliveryStatus::PendingVolunteerAssignment);
    assert_eq!(request.recipient_id, recipient.id);
    assert!(request.assigned_volunteer_id.is_none());

    let accepted = deliveries::accept_request(&pool, &request.id, &volunteer)
        .await
        .unwrap();
    assert_eq!(accepted.status, DeliveryStatus::AssignedToVolunteer);
    assert_eq!(accepted.assigned_volunteer_id, Some(volunteer.id));
    assert_eq!(accepted.assigned_volunteer_name.as_deref(), Some("Test User"));
    assert!(accepted.assigned_at.is_some());

    // The listing follows the request into its assigned state.
    let current = listings::get_listing(&pool, &listing.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.status, ListingStatus::VolunteerAssigned);
}

#[tokio::test]
#[serial]
async fn concurrent_accepts_admit_exactly_one_volunteer() {
    let pool = setup_pool().await;
    let donor = create_test_user(&pool, Role::Donor).await;
    let recipient = create_test_user(&pool, Role::Recipient).await;
    let v1 = create_test_user(&pool, Role::Volunteer).await;
    let v2 = create_test_user(&pool, Role::Volunteer).await;

    let listing = listings::create_listing(&pool, &donor, &sample_listing())
        .await
        .unwrap();
    let (_, request) = deliveries::request_delivery(&pool, &listing.id, &recipient)
        .await
        .unwrap();

    let (a, b) = tokio::join!(
        deliveries::accept_request(&pool, &request.id, &v1),
        deliveries::accept_request(&pool, &request.id, &v2),
    );

    let winners = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(winners, 1, "exactly one concurrent accept must win");

    let a_won = a.is_ok();
    let loser = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
    assert_eq!(loser.error_code(), "ALREADY_HANDLED");

    // The stored assignment matches whichever task won.
    let winner_id = if a_won { v1.id } else { v2.id };
    let current = deliveries::get_request(&pool, &request.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.assigned_volunteer_id, Some(winner_id));
}

#[tokio::test]
#[serial]
async fn accept_is_rejected_when_the_listing_left_delivery_requested() {
    let pool = setup_pool().await;
    let donor = create_test_user(&pool, Role::Donor).await;
    let recipient = create_test_user(&pool, Role::Recipient).await;
    let volunteer = create_test_user(&pool, Role::Volunteer).await;

    let listing = listings::create_listing(&pool, &donor, &sample_listing())
        .await
        .unwrap();
    let (_, request) = deliveries::request_delivery(&pool, &listing.id, &recipient)
        .await
        .unwrap();

    // An operator retires the listing while the request still looks pending.
    sqlx::query("UPDATE food_listings SET status = 'expired' WHERE id = $1")
        .bind(listing.id)
        .execute(&pool)
        .await
        .unwrap();

    let err = deliveries::accept_request(&pool, &request.id, &volunteer)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "ALREADY_HANDLED");

    // The rolled-back transaction left the request untouched.
    let current = deliveries::get_request(&pool, &request.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current.status, DeliveryStatus::PendingVolunteerAssignment);
    assert!(current.assigned_volunteer_id.is_none());
    assert!(current.assigned_at.is_none());

    let current_listing = listings::get_listing(&pool, &listing.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(current_listing.status, ListingStatus::Expired);
}

#[tokio::test]
#[serial]
async fn delivery_request_on_claimed_listing_conflicts() {
    let pool = setup_pool().await;
    let donor = create_test_user(&pool, Role::Donor).await;
    let recipient = create_test_user(&pool, Role::Recipient).await;
    let other = create_test_user(&pool, Role::Recipient).await;

    let listing = listings::create_listing(&pool, &donor, &sample_listing())
        .await
        .unwrap();
    listings::claim_self_pickup(&pool, &listing.id, &recipient)
        .await
        .unwrap();

    let err = deliveries::request_delivery(&pool, &listing.id, &other)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "ALREADY_HANDLED");

    // No orphan request row was left behind by the rolled-back transaction.
    let pending = deliveries::pending_requests(&pool).await.unwrap();
    assert!(pending.iter().all(|r| r.listing_id != listing.id));
}

#[tokio::test]
#[serial]
async fn pending_queue_is_first_come_first_served() {
    let pool = setup_pool().await;
    let donor = create_test_user(&pool, Role::Donor).await;
    let recipient = create_test_user(&pool, Role::Recipient).await;

    let mut request_ids = Vec::new();
    for _ in 0..3 {
        let listing = listings::create_listing(&pool, &donor, &sample_listing())
            .await
            .unwrap();
        let (_, request) = deliveries::request_delivery(&pool, &listing.id, &recipient)
            .await
            .unwrap();
        request_ids.push(request.id);
    }

    let pending = deliveries::pending_requests(&pool).await.unwrap();
    let positions: Vec<usize> = request_ids
        .iter()
        .map(|id| pending.iter().position(|r| r.id == *id).unwrap())
        .collect();
    assert!(
        positions.windows(2).all(|w| w[0] < w[1]),
        "older requests must come first: {:?}",
        positions
    );
}

#[tokio::test]
#[serial]
async fn browse_excludes_claimed_and_assigned_listings() {
    let pool = setup_pool().await;
    let donor = create_test_user(&pool, Role::Donor).await;
    let recipient = create_test_user(&pool, Role::Recipient).await;

    let open = listings::create_listing(&pool, &donor, &sample_listing())
        .await
        .unwrap();
    let claimed = listings::create_listing(&pool, &donor, &sample_listing())
        .await
        .unwrap();
    listings::claim_self_pickup(&pool, &claimed.id, &recipient)
        .await
        .unwrap();
    let requested = listings::create_listing(&pool, &donor, &sample_listing())
        .await
        .unwrap();
    deliveries::request_delivery(&pool, &requested.id, &recipient)
        .await
        .unwrap();

    let browse = listings::browse_open_listings(&pool).await.unwrap();
    assert!(browse.iter().any(|l| l.id == open.id));
    assert!(browse.iter().all(|l| l.id != claimed.id));
    assert!(browse.iter().all(|l| l.id != requested.id));

    // Donors still see everything of theirs, newest first.
    let mine = listings::listings_by_donor(&pool, &donor.id).await.unwrap();
    for id in [open.id, claimed.id, requested.id] {
        assert!(mine.iter().any(|l| l.id == id));
    }
}

#[tokio::test]
#[serial]
async fn impact_stats_count_claims_but_not_retired_listings() {
    let pool = setup_pool().await;
    let donor = create_test_user(&pool, Role::Donor).await;
    let recipient = create_test_user(&pool, Role::Recipient).await;

    let before = stats::impact_stats(&pool).await.unwrap();

    // An unclaimed listing an operator retires must not count as claimed.
    let retired = listings::create_listing(&pool, &donor, &sample_listing())
        .await
        .unwrap();
    sqlx::query("UPDATE food_listings SET status = 'expired' WHERE id = $1")
        .bind(retired.id)
        .execute(&pool)
        .await
        .unwrap();

    let claimed = listings::create_listing(&pool, &donor, &sample_listing())
        .await
        .unwrap();
    listings::claim_self_pickup(&pool, &claimed.id, &recipient)
        .await
        .unwrap();

    let after = stats::impact_stats(&pool).await.unwrap();
    assert_eq!(after.listings_posted, before.listings_posted + 2);
    assert_eq!(after.listings_claimed, before.listings_claimed + 1);
}

#[tokio::test]
#[serial]
async fn password_reset_token_round_trip() {
    let pool = setup_pool().await;
    let user = create_test_user(&pool, Role::Recipient).await;

    let token = users::create_password_reset_token(&pool, &user.id, 2)
        .await
        .unwrap();

    // Consuming is one-shot.
    let uid = users::consume_password_reset_token(&pool, &token)
        .await
        .unwrap();
    assert_eq!(uid, Some(user.id));
    let again = users::consume_password_reset_token(&pool, &token)
        .await
        .unwrap();
    assert_eq!(again, None);

    users::update_user_password(&pool, &user.id, "a-brand-new-password")
        .await
        .unwrap();
    let reloaded = users::get_user_by_id(&pool, &user.id)
        .await
        .unwrap()
        .unwrap();
    assert!(users::verify_password(&reloaded, "a-brand-new-password").unwrap());
    assert!(!users::verify_password(&reloaded, "test-password-123").unwrap());
}

#[tokio::test]
#[serial]
async fn duplicate_email_is_rejected() {
    let pool = setup_pool().await;
    let email = format!("dup-{}@test.example", Uuid::new_v4());

    users::create_user(&pool, &email, "some-password-1", "First", Role::Donor)
        .await
        .unwrap();
    let err = users::create_user(&pool, &email, "some-password-2", "Second", Role::Recipient)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {:?}", err);
}

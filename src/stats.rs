// ============================================================================
// Impact Statistics
// ============================================================================

use serde::Serialize;

use crate::db::DbPool;
use crate::error::AppResult;

/// Community-wide totals for the landing page.
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ImpactStats {
    pub listings_posted: i64,
    pub listings_claimed: i64,
    pub deliveries_assigned: i64,
    pub registered_volunteers: i64,
}

/// "Claimed" counts only listings a recipient committed to; listings an
/// operator retired as `expired` or `fulfilled` without a claim do not
/// inflate the number.
pub async fn impact_stats(pool: &DbPool) -> AppResult<ImpactStats> {
    let stats = sqlx::query_as::<_, ImpactStats>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM food_listings) AS listings_posted,
            (SELECT COUNT(*) FROM food_listings WHERE status IN
                ('claimed_by_recipient', 'delivery_requested', 'volunteer_assigned')
            ) AS listings_claimed,
            (SELECT COUNT(*) FROM delivery_requests
                WHERE status = 'assigned_to_volunteer') AS deliveries_assigned,
            (SELECT COUNT(*) FROM users WHERE role = 'volunteer') AS registered_volunteers
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(stats)
}

// ============================================================================
// Access/Role Gate
// ============================================================================
//
// Every mutating operation validates the acting user's role before touching
// the store. Checks take the actor as an explicit parameter; nothing here
// reads ambient session state.
//
// ============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;

/// Closed set of account roles. Fixed at signup; no operation changes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Donor,
    Recipient,
    Volunteer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Donor => "donor",
            Role::Recipient => "recipient",
            Role::Volunteer => "volunteer",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "donor" => Ok(Role::Donor),
            "recipient" => Ok(Role::Recipient),
            "volunteer" => Ok(Role::Volunteer),
            "admin" => Ok(Role::Admin),
            other => Err(AppError::validation(format!("Unknown role: {}", other))),
        }
    }
}

// Store roles as TEXT; decode through FromStr so an unexpected value
// surfaces as an error instead of a panic.
impl sqlx::Type<sqlx::Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <&str as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <&str as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Role {
    fn decode(
        value: sqlx::postgres::PgValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<'r, sqlx::Postgres>>::decode(value)?;
        Ok(s.parse()?)
    }
}

/// Reject unless the actor holds the required role.
pub fn require_role(actor_role: Role, required: Role, action: &str) -> Result<(), AppError> {
    if actor_role == required {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "Only a {} can {}",
            required, action
        )))
    }
}

/// Create listing: donors only.
pub fn ensure_can_create_listing(actor_role: Role) -> Result<(), AppError> {
    require_role(actor_role, Role::Donor, "post a food listing")
}

/// Self-pickup claim and volunteer-delivery request: recipients only.
pub fn ensure_can_claim_listing(actor_role: Role) -> Result<(), AppError> {
    require_role(actor_role, Role::Recipient, "request a food listing")
}

/// Accept a delivery request: volunteers only.
pub fn ensure_can_accept_delivery(actor_role: Role) -> Result<(), AppError> {
    require_role(actor_role, Role::Volunteer, "accept a delivery request")
}

//! Domain model structs persisted in the SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the HTTP layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dropspot_shared::{ClaimCode, UserId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// An identity the core has seen. Owned by the authentication collaborator;
/// recorded here so waitlist and claim rows can reference it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    /// When the account was created upstream (drives priority scoring).
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Drop
// ---------------------------------------------------------------------------

/// A stocked, time-windowed offer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Drop {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// Ceiling on the number of claims ever issued for this drop.
    pub stock: i64,
    pub claim_window_start: DateTime<Utc>,
    pub claim_window_end: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Waitlist entry
// ---------------------------------------------------------------------------

/// A user's registered interest in a drop. At most one per (user, drop).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WaitlistEntry {
    pub id: Uuid,
    pub user_id: UserId,
    pub drop_id: Uuid,
    pub priority_score: i64,
    pub joined_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Claim
// ---------------------------------------------------------------------------

/// One unit of a drop's stock allocated to a user. Never updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claim {
    pub id: Uuid,
    pub user_id: UserId,
    pub drop_id: Uuid,
    pub claim_code: ClaimCode,
    pub claimed_at: DateTime<Utc>,
}

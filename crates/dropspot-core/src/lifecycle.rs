//! Drop lifecycle: window checks, remaining stock and derived status.
//!
//! There is no stored state machine. A drop is `Upcoming` before its window,
//! `Active` inside it (both bounds inclusive) and `Closed` after it, as of
//! whatever `now` the caller passes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dropspot_store::{Database, Drop, StoreError};

use crate::error::{EngineError, Entity, NotOpenReason, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropStatus {
    Upcoming,
    Active,
    Closed,
}

/// Where `now` falls relative to a drop's claim window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowGate {
    NotStarted,
    Open,
    Ended,
}

impl WindowGate {
    /// The claim rejection this gate implies, if any.
    pub fn rejection(self) -> Option<NotOpenReason> {
        match self {
            WindowGate::NotStarted => Some(NotOpenReason::NotStarted),
            WindowGate::Open => None,
            WindowGate::Ended => Some(NotOpenReason::Ended),
        }
    }
}

pub fn window_gate(drop: &Drop, now: DateTime<Utc>) -> WindowGate {
    if now < drop.claim_window_start {
        WindowGate::NotStarted
    } else if now > drop.claim_window_end {
        WindowGate::Ended
    } else {
        WindowGate::Open
    }
}

/// `claim_window_start <= now <= claim_window_end`.
pub fn is_window_open(drop: &Drop, now: DateTime<Utc>) -> bool {
    window_gate(drop, now) == WindowGate::Open
}

pub fn status(drop: &Drop, now: DateTime<Utc>) -> DropStatus {
    match window_gate(drop, now) {
        WindowGate::NotStarted => DropStatus::Upcoming,
        WindowGate::Open => DropStatus::Active,
        WindowGate::Ended => DropStatus::Closed,
    }
}

/// Stock left after `issued` claims. Clamped at zero; an overdrawn drop
/// would be an invariant violation elsewhere, not a negative answer here.
pub fn remaining_stock(drop: &Drop, issued: i64) -> i64 {
    (drop.stock - issued).max(0)
}

// ---------------------------------------------------------------------------
// Read models
// ---------------------------------------------------------------------------

/// Which drops the public listing shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropFilter {
    Active,
    Upcoming,
    /// Active followed by upcoming. Closed drops are never listed publicly.
    #[default]
    All,
}

/// A drop enriched with its live counters.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DropSummary {
    #[serde(flatten)]
    pub drop: Drop,
    pub remaining_stock: i64,
    pub claim_count: i64,
    pub is_window_open: bool,
    pub status: DropStatus,
}

/// A single drop as seen by a (possibly anonymous) viewer.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DropDetails {
    #[serde(flatten)]
    pub summary: DropSummary,
    pub user_has_claimed: bool,
    pub user_in_waitlist: bool,
}

pub(crate) fn summarize(db: &Database, drop: Drop, now: DateTime<Utc>) -> Result<DropSummary> {
    let claim_count = db.count_claims_for_drop(drop.id)?;
    Ok(DropSummary {
        remaining_stock: remaining_stock(&drop, claim_count),
        claim_count,
        is_window_open: is_window_open(&drop, now),
        status: status(&drop, now),
        drop,
    })
}

/// Fetch a drop, turning a missing row into the domain `NotFound`.
pub(crate) fn load_drop(db: &Database, id: Uuid) -> Result<Drop> {
    db.get_drop(id).map_err(|e| match e {
        StoreError::NotFound => EngineError::NotFound(Entity::Drop),
        other => EngineError::Storage(other),
    })
}

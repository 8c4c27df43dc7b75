//! Admin lifecycle: create, update and delete drops, validated against the
//! claims already issued.
//!
//! Update and delete read the claim count and write in the same unit of
//! work, so a claim cannot slip in between the check and the change.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use dropspot_store::codec::normalize;
use dropspot_store::{Database, Drop};

use crate::error::{EngineError, Result};
use crate::lifecycle::load_drop;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewDrop {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub stock: i64,
    pub claim_window_start: DateTime<Utc>,
    pub claim_window_end: DateTime<Utc>,
}

/// A partial update. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DropUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub stock: Option<i64>,
    pub claim_window_start: Option<DateTime<Utc>>,
    pub claim_window_end: Option<DateTime<Utc>>,
}

fn check_window(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if end <= start {
        return Err(EngineError::Validation(
            "Claim window end must be after start".to_string(),
        ));
    }
    Ok(())
}

pub fn create(db: &Database, input: NewDrop, now: DateTime<Utc>) -> Result<Drop> {
    let start = normalize(input.claim_window_start);
    let end = normalize(input.claim_window_end);
    check_window(start, end)?;

    if input.stock <= 0 {
        return Err(EngineError::Validation(
            "Stock must be greater than 0".to_string(),
        ));
    }

    let drop = Drop {
        id: Uuid::new_v4(),
        title: input.title,
        description: input.description,
        stock: input.stock,
        claim_window_start: start,
        claim_window_end: end,
        created_at: now,
    };
    db.insert_drop(&drop)?;
    Ok(drop)
}

/// Apply `update` to an existing drop and return the stored result.
///
/// The window is checked after merging, so moving only one edge cannot
/// invert it.
pub fn update(db: &Database, drop_id: Uuid, update: DropUpdate) -> Result<Drop> {
    let mut drop = load_drop(db, drop_id)?;

    if let Some(stock) = update.stock {
        if stock < 0 {
            return Err(EngineError::Validation(
                "Stock cannot be negative".to_string(),
            ));
        }
        let issued = db.count_claims_for_drop(drop_id)?;
        if stock < issued {
            return Err(EngineError::Validation(format!(
                "Cannot reduce stock below current claims ({issued})"
            )));
        }
        drop.stock = stock;
    }

    if let Some(start) = update.claim_window_start {
        drop.claim_window_start = normalize(start);
    }
    if let Some(end) = update.claim_window_end {
        drop.claim_window_end = normalize(end);
    }
    check_window(drop.claim_window_start, drop.claim_window_end)?;

    if let Some(title) = update.title {
        drop.title = title;
    }
    if let Some(description) = update.description {
        drop.description = Some(description);
    }

    db.update_drop(&drop)?;
    Ok(drop)
}

/// Delete a drop that has no claims. Its waitlist goes with it.
pub fn delete(db: &Database, drop_id: Uuid) -> Result<bool> {
    load_drop(db, drop_id)?;

    let issued = db.count_claims_for_drop(drop_id)?;
    if issued > 0 {
        return Err(EngineError::Validation(format!(
            "Cannot delete drop with active claims ({issued} claims)"
        )));
    }

    Ok(db.delete_drop(drop_id)?)
}

//! Claim ledger: stock-limited claim admission and claim-code issuance.
//!
//! [`ClaimLedger::claim`] must run inside a single unit of work. Its checks
//! and the insert that follows them are only race-free because nothing else
//! can touch the database between them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use dropspot_shared::claim_code::is_valid_format;
use dropspot_shared::constants::MAX_CLAIM_CODE_ATTEMPTS;
use dropspot_shared::{ClaimCode, ClaimCodeSource, OsRandomCodes, UserId};
use dropspot_store::{Claim, Database, Drop};

use crate::error::{EngineError, Entity, Result};
use crate::lifecycle::{self, load_drop};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClaimOutcome {
    pub claim: Claim,
    /// `false` when the user already held this claim.
    pub is_new: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ClaimWithDrop {
    #[serde(flatten)]
    pub claim: Claim,
    pub drop: Drop,
}

/// Every claim issued for one drop, oldest first.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DropClaims {
    pub drop: Drop,
    pub total_claims: i64,
    pub remaining_stock: i64,
    pub claims: Vec<Claim>,
}

#[derive(Clone)]
pub struct ClaimLedger {
    codes: Arc<dyn ClaimCodeSource>,
    max_attempts: u32,
}

impl Default for ClaimLedger {
    fn default() -> Self {
        Self::new(Arc::new(OsRandomCodes))
    }
}

impl ClaimLedger {
    pub fn new(codes: Arc<dyn ClaimCodeSource>) -> Self {
        Self {
            codes,
            max_attempts: MAX_CLAIM_CODE_ATTEMPTS,
        }
    }

    /// Admit a claim for `user_id` on `drop_id`.
    ///
    /// An existing claim is returned as-is before any window, waitlist or
    /// stock check, so retries after the window closes or the drop sells
    /// out still see the code they were first issued.
    pub fn claim(
        &self,
        db: &Database,
        user_id: UserId,
        drop_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<ClaimOutcome> {
        let drop = load_drop(db, drop_id)?;

        if let Some(claim) = db.find_claim(user_id, drop_id)? {
            return Ok(ClaimOutcome {
                claim,
                is_new: false,
            });
        }

        if let Some(reason) = lifecycle::window_gate(&drop, now).rejection() {
            return Err(EngineError::WindowNotOpen(reason));
        }

        if db.find_waitlist_entry(user_id, drop_id)?.is_none() {
            return Err(EngineError::WaitlistRequired);
        }

        let issued = db.count_claims_for_drop(drop_id)?;
        if lifecycle::remaining_stock(&drop, issued) <= 0 {
            return Err(EngineError::SoldOut);
        }

        let claim = Claim {
            id: Uuid::new_v4(),
            user_id,
            drop_id,
            claim_code: self.unused_code(db)?,
            claimed_at: now,
        };
        db.insert_claim(&claim)?;

        Ok(ClaimOutcome {
            claim,
            is_new: true,
        })
    }

    /// Draw codes until one is not yet persisted.
    fn unused_code(&self, db: &Database) -> Result<ClaimCode> {
        for attempt in 1..=self.max_attempts {
            let code = self.codes.next_code();
            if !db.claim_code_exists(code.as_str())? {
                return Ok(code);
            }
            warn!(attempt, "Claim code collision, drawing again");
        }
        Err(EngineError::CodeGenerationExhausted(self.max_attempts))
    }

    pub fn list_by_user(&self, db: &Database, user_id: UserId) -> Result<Vec<ClaimWithDrop>> {
        db.list_claims_for_user(user_id)?
            .into_iter()
            .map(|claim| {
                let drop = load_drop(db, claim.drop_id)?;
                Ok(ClaimWithDrop { claim, drop })
            })
            .collect()
    }

    /// Look a claim up by its code, case-insensitively. Malformed codes are
    /// simply not found.
    pub fn find_by_code(&self, db: &Database, code: &str) -> Result<ClaimWithDrop> {
        let code = code.trim().to_ascii_uppercase();
        if !is_valid_format(&code) {
            return Err(EngineError::NotFound(Entity::Claim));
        }

        let claim = db
            .find_claim_by_code(&code)?
            .ok_or(EngineError::NotFound(Entity::Claim))?;
        let drop = load_drop(db, claim.drop_id)?;
        Ok(ClaimWithDrop { claim, drop })
    }

    pub fn list_by_drop(&self, db: &Database, drop_id: Uuid) -> Result<DropClaims> {
        let drop = load_drop(db, drop_id)?;
        let claims = db.list_claims_for_drop(drop_id)?;
        let total_claims = claims.len() as i64;

        Ok(DropClaims {
            remaining_stock: lifecycle::remaining_stock(&drop, total_claims),
            total_claims,
            claims,
            drop,
        })
    }

    /// Administrative removal. `Ok(false)` if no such claim existed.
    pub fn purge(&self, db: &Database, claim_id: Uuid) -> Result<bool> {
        Ok(db.delete_claim(claim_id)?)
    }
}

impl std::fmt::Debug for ClaimLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimLedger")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

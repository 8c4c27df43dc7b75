//! Waitlist ledger: idempotent join/leave and priority-ordered ranking.
//!
//! Every function here takes a `&Database` that the caller has already
//! placed inside a unit of work; none of them lock or open transactions on
//! their own.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dropspot_shared::constants::SIGNUP_LATENCY_JITTER_MS;
use dropspot_shared::{Identity, PriorityScorer, SignupSignals, UserId};
use dropspot_store::{Database, Drop, WaitlistEntry};

use crate::error::{EngineError, Result};
use crate::lifecycle::{self, load_drop, WindowGate};

/// Caller-supplied scoring inputs for a join.
///
/// Neither signal is measured by the core. When `signup_latency_ms` is
/// `None` a random 0-999 ms placeholder is used; `rapid_actions` defaults to
/// zero until an upstream abuse tracker supplies it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct JoinOptions {
    pub signup_latency_ms: Option<u64>,
    #[serde(default)]
    pub rapid_actions: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct JoinOutcome {
    pub entry: WaitlistEntry,
    pub position: u64,
    pub total_waitlist: u64,
    /// `false` when the entry already existed and was returned unchanged.
    pub is_new: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RankedEntry {
    #[serde(flatten)]
    pub entry: WaitlistEntry,
    pub position: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WaitlistView {
    pub drop: Drop,
    pub total_waitlist: u64,
    pub entries: Vec<RankedEntry>,
}

/// One of a user's own entries, with where it currently stands.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserWaitlistEntry {
    #[serde(flatten)]
    pub entry: WaitlistEntry,
    pub drop: Drop,
    pub position: u64,
    pub total_waitlist: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct WaitlistLedger {
    scorer: PriorityScorer,
}

impl WaitlistLedger {
    pub fn new(scorer: PriorityScorer) -> Self {
        Self { scorer }
    }

    /// Admit `identity` to the drop's waitlist, or return the entry it
    /// already holds without re-scoring it.
    ///
    /// Joining before the window opens is allowed; joining after it has
    /// ended is not. A user who already claimed the drop cannot rejoin.
    ///
    /// Account age is measured from the user row recorded on first sight,
    /// not from whatever creation time this request carries.
    pub fn join(
        &self,
        db: &Database,
        identity: &Identity,
        drop_id: Uuid,
        options: JoinOptions,
        now: DateTime<Utc>,
    ) -> Result<JoinOutcome> {
        let drop = load_drop(db, drop_id)?;
        let user_id = identity.user_id;

        if db.find_claim(user_id, drop_id)?.is_some() {
            return Err(EngineError::Conflict(
                "You have already claimed this drop".to_string(),
            ));
        }

        if lifecycle::window_gate(&drop, now) == WindowGate::Ended {
            return Err(EngineError::WindowClosed);
        }

        let (entry, is_new) = match db.find_waitlist_entry(user_id, drop_id)? {
            Some(existing) => (existing, false),
            None => {
                db.ensure_user(identity)?;
                let known = db.get_user(user_id)?;

                let signals = SignupSignals {
                    signup_latency_ms: options
                        .signup_latency_ms
                        .unwrap_or_else(|| rand::thread_rng().gen_range(0..SIGNUP_LATENCY_JITTER_MS)),
                    account_age_days: Identity::new(known.id, known.created_at)
                        .account_age_days(now),
                    rapid_actions: options.rapid_actions,
                };

                let entry = WaitlistEntry {
                    id: Uuid::new_v4(),
                    user_id,
                    drop_id,
                    priority_score: self.scorer.score(&signals),
                    joined_at: now,
                };
                db.insert_waitlist_entry(&entry)?;
                (entry, true)
            }
        };

        let position = db
            .waitlist_position(user_id, drop_id)?
            .ok_or_else(|| EngineError::Internal("waitlist entry missing after join".into()))?;
        let total_waitlist = db.count_waitlist(drop_id)?;

        Ok(JoinOutcome {
            entry,
            position,
            total_waitlist,
            is_new,
        })
    }

    /// Remove the user's entry. `Ok(false)` if there was none.
    pub fn leave(&self, db: &Database, user_id: UserId, drop_id: Uuid) -> Result<bool> {
        load_drop(db, drop_id)?;
        Ok(db.delete_waitlist_entry(user_id, drop_id)?)
    }

    /// 1-indexed rank, or `None` when the user holds no entry.
    pub fn position(&self, db: &Database, user_id: UserId, drop_id: Uuid) -> Result<Option<u64>> {
        Ok(db.waitlist_position(user_id, drop_id)?)
    }

    pub fn list_by_drop(&self, db: &Database, drop_id: Uuid) -> Result<WaitlistView> {
        let drop = load_drop(db, drop_id)?;
        let entries: Vec<RankedEntry> = db
            .list_waitlist_for_drop(drop_id)?
            .into_iter()
            .zip(1u64..)
            .map(|(entry, position)| RankedEntry { entry, position })
            .collect();

        Ok(WaitlistView {
            drop,
            total_waitlist: entries.len() as u64,
            entries,
        })
    }

    pub fn list_by_user(&self, db: &Database, user_id: UserId) -> Result<Vec<UserWaitlistEntry>> {
        let mut out = Vec::new();
        for entry in db.list_waitlist_for_user(user_id)? {
            let drop = load_drop(db, entry.drop_id)?;
            let position = db
                .waitlist_position(user_id, entry.drop_id)?
                .ok_or_else(|| EngineError::Internal("waitlist entry vanished mid-read".into()))?;
            let total_waitlist = db.count_waitlist(entry.drop_id)?;
            out.push(UserWaitlistEntry {
                entry,
                drop,
                position,
                total_waitlist,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::error::Entity;
    use crate::test_utils::{drop_opening_in, identity, scorer, t0};

    fn db_with(drop: &Drop) -> Database {
        let db = Database::open_in_memory().unwrap();
        db.insert_drop(drop).unwrap();
        db
    }

    fn latency(ms: u64) -> JoinOptions {
        JoinOptions {
            signup_latency_ms: Some(ms),
            rapid_actions: 0,
        }
    }

    #[test]
    fn join_scores_and_ranks() {
        let drop = drop_opening_in(Duration::hours(-1), 5);
        let db = db_with(&drop);
        let ledger = WaitlistLedger::new(scorer());
        let who = identity(30);

        let outcome = ledger.join(&db, &who, drop.id, latency(20), t0()).unwrap();

        // 1000 + 20 % 7 + 30 % 13 - 0
        assert_eq!(outcome.entry.priority_score, 1010);
        assert_eq!(outcome.position, 1);
        assert_eq!(outcome.total_waitlist, 1);
        assert!(outcome.is_new);
    }

    #[test]
    fn join_is_idempotent_and_does_not_rescore() {
        let drop = drop_opening_in(Duration::hours(-1), 5);
        let db = db_with(&drop);
        let ledger = WaitlistLedger::new(scorer());
        let who = identity(30);

        let first = ledger.join(&db, &who, drop.id, latency(20), t0()).unwrap();
        let second = ledger
            .join(&db, &who, drop.id, latency(3), t0() + Duration::minutes(5))
            .unwrap();

        assert_eq!(first.entry, second.entry);
        assert!(!second.is_new);
        assert_eq!(db.count_waitlist(drop.id).unwrap(), 1);
    }

    #[test]
    fn join_before_window_is_allowed() {
        let drop = drop_opening_in(Duration::days(1), 5);
        let db = db_with(&drop);
        let ledger = WaitlistLedger::new(scorer());

        assert!(ledger
            .join(&db, &identity(1), drop.id, JoinOptions::default(), t0())
            .is_ok());
    }

    #[test]
    fn join_after_window_is_rejected() {
        let drop = drop_opening_in(Duration::days(-2), 5);
        let db = db_with(&drop);
        let ledger = WaitlistLedger::new(scorer());

        let err = ledger
            .join(&db, &identity(1), drop.id, JoinOptions::default(), t0())
            .unwrap_err();
        assert!(matches!(err, EngineError::WindowClosed));
        assert_eq!(db.count_waitlist(drop.id).unwrap(), 0);
    }

    #[test]
    fn join_unknown_drop_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let ledger = WaitlistLedger::new(scorer());

        let err = ledger
            .join(&db, &identity(1), Uuid::new_v4(), JoinOptions::default(), t0())
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(Entity::Drop)));
    }

    #[test]
    fn leave_is_idempotent() {
        let drop = drop_opening_in(Duration::hours(-1), 5);
        let db = db_with(&drop);
        let ledger = WaitlistLedger::new(scorer());
        let who = identity(1);

        ledger
            .join(&db, &who, drop.id, JoinOptions::default(), t0())
            .unwrap();

        assert!(ledger.leave(&db, who.user_id, drop.id).unwrap());
        assert!(!ledger.leave(&db, who.user_id, drop.id).unwrap());
        assert_eq!(ledger.position(&db, who.user_id, drop.id).unwrap(), None);

        assert!(matches!(
            ledger.leave(&db, who.user_id, Uuid::new_v4()),
            Err(EngineError::NotFound(Entity::Drop))
        ));
    }

    #[test]
    fn ordering_by_score_then_join_time() {
        let drop = drop_opening_in(Duration::hours(-1), 5);
        let db = db_with(&drop);
        let ledger = WaitlistLedger::new(scorer());

        // 1000 + latency % 7 + age % 13: scores 1005, 1010, 1005 joined in
        // that order.
        let a = identity(0);
        let b = identity(4);
        let c = identity(0);
        ledger.join(&db, &a, drop.id, latency(5), t0()).unwrap();
        ledger
            .join(&db, &b, drop.id, latency(6), t0() + Duration::seconds(1))
            .unwrap();
        ledger
            .join(&db, &c, drop.id, latency(12), t0() + Duration::seconds(2))
            .unwrap();

        let view = ledger.list_by_drop(&db, drop.id).unwrap();
        let order: Vec<_> = view
            .entries
            .iter()
            .map(|r| (r.entry.user_id, r.entry.priority_score, r.position))
            .collect();

        assert_eq!(
            order,
            vec![
                (b.user_id, 1010, 1),
                (a.user_id, 1005, 2),
                (c.user_id, 1005, 3),
            ]
        );
        assert_eq!(view.total_waitlist, 3);
        assert_eq!(ledger.position(&db, c.user_id, drop.id).unwrap(), Some(3));
    }

    #[test]
    fn account_age_is_fixed_at_first_sight() {
        let first = drop_opening_in(Duration::hours(-1), 5);
        let second = drop_opening_in(Duration::hours(-1), 5);
        let db = db_with(&first);
        db.insert_drop(&second).unwrap();
        let ledger = WaitlistLedger::new(scorer());

        let seasoned = identity(5);
        // Same user, later request claiming a brand new account.
        let fresh = Identity::new(seasoned.user_id, t0());

        let a = ledger
            .join(&db, &seasoned, first.id, latency(0), t0())
            .unwrap();
        let b = ledger.join(&db, &fresh, second.id, latency(0), t0()).unwrap();

        assert_eq!(a.entry.priority_score, 1005);
        assert_eq!(b.entry.priority_score, 1005);
        assert_eq!(
            db.get_user(seasoned.user_id).unwrap().created_at,
            seasoned.account_created_at
        );
    }

    #[test]
    fn list_by_user_carries_drop_and_rank() {
        let drop = drop_opening_in(Duration::hours(-1), 5);
        let db = db_with(&drop);
        let ledger = WaitlistLedger::new(scorer());
        let who = identity(1);

        ledger
            .join(&db, &identity(1), drop.id, latency(6), t0())
            .unwrap();
        ledger.join(&db, &who, drop.id, latency(0), t0()).unwrap();

        let mine = ledger.list_by_user(&db, who.user_id).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].drop.id, drop.id);
        assert_eq!(mine[0].position, 2);
        assert_eq!(mine[0].total_waitlist, 2);
    }
}

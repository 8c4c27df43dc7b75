//! [`DropEngine`]: the operations an HTTP layer (or any other caller) binds
//! to, each mapped onto one unit of work on the [`Ledger`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use dropspot_shared::{ClaimCodeSource, Identity, PriorityScorer, UserId};
use dropspot_store::codec::normalize;
use dropspot_store::{Database, Drop};

use crate::admin::{self, DropUpdate, NewDrop};
use crate::claims::{ClaimLedger, ClaimOutcome, ClaimWithDrop, DropClaims};
use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::ledger::Ledger;
use crate::lifecycle::{self, load_drop, DropDetails, DropFilter, DropSummary};
use crate::waitlist::{JoinOptions, JoinOutcome, UserWaitlistEntry, WaitlistLedger, WaitlistView};

pub struct DropEngine {
    ledger: Ledger,
    waitlist: WaitlistLedger,
    claims: ClaimLedger,
    clock: Arc<dyn Clock>,
}

impl DropEngine {
    pub fn new(db: Database, scorer: PriorityScorer) -> Self {
        Self {
            ledger: Ledger::new(db),
            waitlist: WaitlistLedger::new(scorer),
            claims: ClaimLedger::default(),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_code_source(mut self, codes: Arc<dyn ClaimCodeSource>) -> Self {
        self.claims = ClaimLedger::new(codes);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        normalize(self.clock.now())
    }

    // ------------------------------------------------------------------
    // Waitlist
    // ------------------------------------------------------------------

    pub fn join_waitlist(
        &self,
        identity: &Identity,
        drop_id: Uuid,
        options: JoinOptions,
    ) -> Result<JoinOutcome> {
        let now = self.now();
        let outcome = self
            .ledger
            .unit_of_work(|db| self.waitlist.join(db, identity, drop_id, options, now))?;

        if outcome.is_new {
            info!(
                user = %identity.user_id,
                drop = %drop_id,
                score = outcome.entry.priority_score,
                position = outcome.position,
                "Joined waitlist"
            );
        } else {
            debug!(user = %identity.user_id, drop = %drop_id, "Already on waitlist");
        }
        Ok(outcome)
    }

    pub fn leave_waitlist(&self, user_id: UserId, drop_id: Uuid) -> Result<bool> {
        let removed = self
            .ledger
            .unit_of_work(|db| self.waitlist.leave(db, user_id, drop_id))?;
        if removed {
            info!(user = %user_id, drop = %drop_id, "Left waitlist");
        }
        Ok(removed)
    }

    pub fn waitlist_position(&self, user_id: UserId, drop_id: Uuid) -> Result<Option<u64>> {
        self.ledger
            .read(|db| self.waitlist.position(db, user_id, drop_id))
    }

    pub fn list_waitlist(&self, drop_id: Uuid) -> Result<WaitlistView> {
        self.ledger.read(|db| self.waitlist.list_by_drop(db, drop_id))
    }

    pub fn user_waitlist(&self, user_id: UserId) -> Result<Vec<UserWaitlistEntry>> {
        self.ledger.read(|db| self.waitlist.list_by_user(db, user_id))
    }

    // ------------------------------------------------------------------
    // Claims
    // ------------------------------------------------------------------

    /// Claim one unit of stock. The waitlist entry is removed after the
    /// claim commits; if that fails the claim still stands.
    pub fn claim_drop(&self, user_id: UserId, drop_id: Uuid) -> Result<ClaimOutcome> {
        let now = self.now();
        let outcome = self
            .ledger
            .unit_of_work(|db| self.claims.claim(db, user_id, drop_id, now))?;

        if !outcome.is_new {
            debug!(user = %user_id, drop = %drop_id, "Returning existing claim");
            return Ok(outcome);
        }

        info!(
            user = %user_id,
            drop = %drop_id,
            code = %outcome.claim.claim_code,
            "Claim issued"
        );

        if let Err(e) = self
            .ledger
            .unit_of_work(|db| Ok(db.delete_waitlist_entry(user_id, drop_id)?))
        {
            warn!(
                user = %user_id,
                drop = %drop_id,
                error = %e,
                "Failed to remove waitlist entry after claim"
            );
        }

        Ok(outcome)
    }

    pub fn user_claims(&self, user_id: UserId) -> Result<Vec<ClaimWithDrop>> {
        self.ledger.read(|db| self.claims.list_by_user(db, user_id))
    }

    pub fn claim_by_code(&self, code: &str) -> Result<ClaimWithDrop> {
        self.ledger.read(|db| self.claims.find_by_code(db, code))
    }

    pub fn drop_claims(&self, drop_id: Uuid) -> Result<DropClaims> {
        self.ledger.read(|db| self.claims.list_by_drop(db, drop_id))
    }

    pub fn purge_claim(&self, claim_id: Uuid) -> Result<bool> {
        let removed = self
            .ledger
            .unit_of_work(|db| self.claims.purge(db, claim_id))?;
        if removed {
            warn!(claim = %claim_id, "Claim purged");
        }
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Drops
    // ------------------------------------------------------------------

    /// A single drop with live counters, plus the viewer's own standing
    /// when `viewer` is given.
    pub fn get_drop(&self, drop_id: Uuid, viewer: Option<UserId>) -> Result<DropDetails> {
        let now = self.now();
        self.ledger.read(|db| {
            let drop = load_drop(db, drop_id)?;
            let summary = lifecycle::summarize(db, drop, now)?;

            let (user_has_claimed, user_in_waitlist) = match viewer {
                Some(user_id) => (
                    db.find_claim(user_id, drop_id)?.is_some(),
                    db.find_waitlist_entry(user_id, drop_id)?.is_some(),
                ),
                None => (false, false),
            };

            Ok(DropDetails {
                summary,
                user_has_claimed,
                user_in_waitlist,
            })
        })
    }

    /// The public listing. Closed drops never appear.
    pub fn browse_drops(&self, filter: DropFilter) -> Result<Vec<DropSummary>> {
        let now = self.now();
        self.ledger.read(|db| {
            let drops = match filter {
                DropFilter::Active => db.list_active_drops(now)?,
                DropFilter::Upcoming => db.list_upcoming_drops(now)?,
                DropFilter::All => {
                    let mut drops = db.list_active_drops(now)?;
                    drops.extend(db.list_upcoming_drops(now)?);
                    drops
                }
            };
            drops
                .into_iter()
                .map(|drop| lifecycle::summarize(db, drop, now))
                .collect()
        })
    }

    /// Every drop regardless of status, newest first.
    pub fn list_drops(&self) -> Result<Vec<DropSummary>> {
        let now = self.now();
        self.ledger.read(|db| {
            db.list_drops()?
                .into_iter()
                .map(|drop| lifecycle::summarize(db, drop, now))
                .collect()
        })
    }

    pub fn create_drop(&self, input: NewDrop) -> Result<Drop> {
        let now = self.now();
        let drop = self
            .ledger
            .unit_of_work(|db| admin::create(db, input, now))?;
        info!(drop = %drop.id, title = %drop.title, stock = drop.stock, "Drop created");
        Ok(drop)
    }

    pub fn update_drop(&self, drop_id: Uuid, update: DropUpdate) -> Result<Drop> {
        let drop = self
            .ledger
            .unit_of_work(|db| admin::update(db, drop_id, update))?;
        info!(drop = %drop.id, stock = drop.stock, "Drop updated");
        Ok(drop)
    }

    pub fn delete_drop(&self, drop_id: Uuid) -> Result<bool> {
        let deleted = self
            .ledger
            .unit_of_work(|db| admin::delete(db, drop_id))?;
        info!(drop = %drop_id, "Drop deleted");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::error::{EngineError, Entity, NotOpenReason};
    use crate::lifecycle::DropStatus;
    use crate::test_utils::{engine, identity, t0};

    fn new_drop(opens_in: Duration, stock: i64) -> NewDrop {
        NewDrop {
            title: "Numbered print".to_string(),
            description: None,
            stock,
            claim_window_start: t0() + opens_in,
            claim_window_end: t0() + opens_in + Duration::hours(2),
        }
    }

    #[test]
    fn join_then_claim_clears_the_waitlist() {
        let (engine, _clock) = engine();
        let drop = engine.create_drop(new_drop(Duration::hours(-1), 2)).unwrap();
        let who = identity(3);

        engine
            .join_waitlist(&who, drop.id, JoinOptions::default())
            .unwrap();
        let details = engine.get_drop(drop.id, Some(who.user_id)).unwrap();
        assert!(details.user_in_waitlist);
        assert!(!details.user_has_claimed);

        let outcome = engine.claim_drop(who.user_id, drop.id).unwrap();
        assert!(outcome.is_new);

        let details = engine.get_drop(drop.id, Some(who.user_id)).unwrap();
        assert!(details.user_has_claimed);
        assert!(!details.user_in_waitlist);
        assert_eq!(details.summary.remaining_stock, 1);
        assert_eq!(details.summary.claim_count, 1);
        assert_eq!(
            engine.waitlist_position(who.user_id, drop.id).unwrap(),
            None
        );
    }

    #[test]
    fn rejoining_after_claim_conflicts() {
        let (engine, _clock) = engine();
        let drop = engine.create_drop(new_drop(Duration::hours(-1), 2)).unwrap();
        let who = identity(3);

        engine
            .join_waitlist(&who, drop.id, JoinOptions::default())
            .unwrap();
        engine.claim_drop(who.user_id, drop.id).unwrap();

        let err = engine
            .join_waitlist(&who, drop.id, JoinOptions::default())
            .unwrap_err();
        assert!(matches!(err, EngineError::Conflict(_)));
    }

    #[test]
    fn window_follows_the_clock() {
        let (engine, clock) = engine();
        let drop = engine.create_drop(new_drop(Duration::hours(1), 2)).unwrap();
        let who = identity(3);

        engine
            .join_waitlist(&who, drop.id, JoinOptions::default())
            .unwrap();
        assert_eq!(
            engine.get_drop(drop.id, None).unwrap().summary.status,
            DropStatus::Upcoming
        );
        assert!(matches!(
            engine.claim_drop(who.user_id, drop.id),
            Err(EngineError::WindowNotOpen(NotOpenReason::NotStarted))
        ));

        clock.advance(Duration::minutes(90));
        assert_eq!(
            engine.get_drop(drop.id, None).unwrap().summary.status,
            DropStatus::Active
        );
        assert!(engine.claim_drop(who.user_id, drop.id).unwrap().is_new);

        clock.advance(Duration::hours(2));
        assert_eq!(
            engine.get_drop(drop.id, None).unwrap().summary.status,
            DropStatus::Closed
        );
        assert!(matches!(
            engine.join_waitlist(&identity(1), drop.id, JoinOptions::default()),
            Err(EngineError::WindowClosed)
        ));
        // The winner still gets their code back.
        assert!(!engine.claim_drop(who.user_id, drop.id).unwrap().is_new);
    }

    #[test]
    fn browse_filters_by_status() {
        let (engine, _clock) = engine();
        let active = engine.create_drop(new_drop(Duration::hours(-1), 1)).unwrap();
        let upcoming = engine.create_drop(new_drop(Duration::hours(3), 1)).unwrap();
        let closed = engine.create_drop(new_drop(Duration::hours(-5), 1)).unwrap();

        let ids = |filter: DropFilter| -> Vec<Uuid> {
            engine
                .browse_drops(filter)
                .unwrap()
                .into_iter()
                .map(|s| s.drop.id)
                .collect()
        };

        assert_eq!(ids(DropFilter::Active), vec![active.id]);
        assert_eq!(ids(DropFilter::Upcoming), vec![upcoming.id]);
        assert_eq!(ids(DropFilter::All), vec![active.id, upcoming.id]);

        let everything: Vec<_> = engine
            .list_drops()
            .unwrap()
            .into_iter()
            .map(|s| s.drop.id)
            .collect();
        assert_eq!(everything.len(), 3);
        assert!(everything.contains(&closed.id));
    }

    #[test]
    fn missing_drop_is_not_found_everywhere() {
        let (engine, _clock) = engine();
        let ghost = Uuid::new_v4();
        let who = identity(1);

        let not_found = |r: Result<()>| matches!(r, Err(EngineError::NotFound(Entity::Drop)));

        assert!(not_found(engine.get_drop(ghost, None).map(|_| ())));
        assert!(not_found(
            engine
                .join_waitlist(&who, ghost, JoinOptions::default())
                .map(|_| ())
        ));
        assert!(not_found(engine.leave_waitlist(who.user_id, ghost).map(|_| ())));
        assert!(not_found(engine.list_waitlist(ghost).map(|_| ())));
        assert!(not_found(engine.claim_drop(who.user_id, ghost).map(|_| ())));
        assert!(not_found(engine.drop_claims(ghost).map(|_| ())));
        assert!(not_found(
            engine.update_drop(ghost, DropUpdate::default()).map(|_| ())
        ));
        assert!(not_found(engine.delete_drop(ghost).map(|_| ())));
    }

    #[test]
    fn user_views_list_own_records() {
        let (engine, _clock) = engine();
        let first = engine.create_drop(new_drop(Duration::hours(-1), 1)).unwrap();
        let second = engine.create_drop(new_drop(Duration::hours(-1), 1)).unwrap();
        let who = identity(3);

        engine
            .join_waitlist(&who, first.id, JoinOptions::default())
            .unwrap();
        engine
            .join_waitlist(&who, second.id, JoinOptions::default())
            .unwrap();
        let claim = engine.claim_drop(who.user_id, first.id).unwrap().claim;

        let waiting = engine.user_waitlist(who.user_id).unwrap();
        assert_eq!(waiting.len(), 1);
        assert_eq!(waiting[0].drop.id, second.id);

        let claims = engine.user_claims(who.user_id).unwrap();
        assert_eq!(claims.len(), 1);
        assert_eq!(claims[0].claim, claim);

        let by_code = engine.claim_by_code(claim.claim_code.as_str()).unwrap();
        assert_eq!(by_code.drop.id, first.id);
    }
}

//! Fixtures shared by the engine's unit tests.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use dropspot_shared::{Identity, PriorityCoefficients, PriorityScorer, UserId};
use dropspot_store::{Database, Drop};

use crate::clock::ManualClock;
use crate::engine::DropEngine;

/// The fixed instant every test clock starts at.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 17, 14, 30, 0)
        .single()
        .unwrap()
}

pub fn scorer() -> PriorityScorer {
    PriorityScorer::new(PriorityCoefficients { a: 7, b: 13, c: 3 })
}

/// An identity whose account is exactly `age_days` old at [`t0`].
pub fn identity(age_days: i64) -> Identity {
    Identity::new(UserId::new(), t0() - Duration::days(age_days))
}

/// A two-hour drop whose window opens `offset` after [`t0`].
pub fn drop_opening_in(offset: Duration, stock: i64) -> Drop {
    let start = t0() + offset;
    Drop {
        id: Uuid::new_v4(),
        title: "Limited sneakers".to_string(),
        description: None,
        stock,
        claim_window_start: start,
        claim_window_end: start + Duration::hours(2),
        created_at: t0() - Duration::days(3),
    }
}

/// An in-memory engine driven by a clock frozen at [`t0`].
pub fn engine() -> (DropEngine, ManualClock) {
    let clock = ManualClock::new(t0());
    let engine = DropEngine::new(Database::open_in_memory().unwrap(), scorer())
        .with_clock(Arc::new(clock.clone()));
    (engine, clock)
}

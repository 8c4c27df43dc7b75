//! # dropspot-core
//!
//! The claim & waitlist consistency engine.
//!
//! [`DropEngine`] is the method-call surface an HTTP layer binds to. Every
//! operation that reads-then-writes runs as one unit of work on the
//! [`Ledger`], which serialises units on a single connection inside an
//! immediate SQLite transaction. That is what keeps claim counts at or below
//! stock, claim codes unique and waitlist joins single-entry under
//! concurrent callers.
//!
//! Time is injected through [`Clock`]; drop status is always recomputed from
//! `(drop, now)` and never stored.

pub mod admin;
pub mod claims;
pub mod clock;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod waitlist;

#[cfg(test)]
mod test_utils;

pub use admin::{DropUpdate, NewDrop};
pub use claims::{ClaimLedger, ClaimOutcome, ClaimWithDrop, DropClaims};
pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::DropEngine;
pub use error::{EngineError, Entity, NotOpenReason, Result};
pub use ledger::Ledger;
pub use lifecycle::{DropDetails, DropFilter, DropStatus, DropSummary, WindowGate};
pub use waitlist::{JoinOptions, JoinOutcome, RankedEntry, UserWaitlistEntry, WaitlistLedger, WaitlistView};

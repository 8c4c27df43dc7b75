//! The atomicity boundary.
//!
//! A [`Ledger`] owns the only database connection behind a mutex. A unit of
//! work holds that mutex from `BEGIN IMMEDIATE` to `COMMIT`/`ROLLBACK`, so
//! units run one at a time. That single serial order covers every scope the
//! engine needs: per-drop claim counts, global claim-code uniqueness and
//! per-(user, drop) waitlist admission.
//!
//! A unit that panics poisons the mutex. The next caller takes the guard
//! anyway and the store rolls back whatever transaction was left open.

use std::sync::{Mutex, MutexGuard, PoisonError};

use dropspot_store::Database;

use crate::error::Result;

pub struct Ledger {
    db: Mutex<Database>,
}

impl Ledger {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    /// Run `work` as one atomic unit: committed if it returns `Ok`, rolled
    /// back entirely if it returns `Err`.
    pub fn unit_of_work<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T>,
    {
        let db = self.lock();
        db.transaction(work)
    }

    /// Run read-only `work` under the ledger lock without opening a
    /// transaction.
    pub fn read<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&Database) -> Result<T>,
    {
        let db = self.lock();
        work(&db)
    }

    fn lock(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

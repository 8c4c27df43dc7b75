//! CRUD operations for [`Drop`] records.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::codec::{decode_ts, decode_uuid, encode_ts};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Drop;

const DROP_COLUMNS: &str =
    "id, title, description, stock, claim_window_start, claim_window_end, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new drop.
    pub fn insert_drop(&self, drop: &Drop) -> Result<()> {
        self.conn().execute(
            "INSERT INTO drops (id, title, description, stock, claim_window_start, claim_window_end, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                drop.id.to_string(),
                drop.title,
                drop.description,
                drop.stock,
                encode_ts(&drop.claim_window_start),
                encode_ts(&drop.claim_window_end),
                encode_ts(&drop.created_at),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single drop by UUID.
    pub fn get_drop(&self, id: Uuid) -> Result<Drop> {
        self.conn()
            .query_row(
                &format!("SELECT {DROP_COLUMNS} FROM drops WHERE id = ?1"),
                params![id.to_string()],
                row_to_drop,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// List all drops, newest first.
    pub fn list_drops(&self) -> Result<Vec<Drop>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {DROP_COLUMNS} FROM drops ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map([], row_to_drop)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Drops whose claim window contains `now`, soonest-started first.
    pub fn list_active_drops(&self, now: DateTime<Utc>) -> Result<Vec<Drop>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {DROP_COLUMNS} FROM drops
             WHERE claim_window_start <= ?1 AND claim_window_end >= ?1
             ORDER BY claim_window_start ASC"
        ))?;
        let rows = stmt.query_map(params![encode_ts(&now)], row_to_drop)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Drops whose claim window has not opened yet, soonest first.
    pub fn list_upcoming_drops(&self, now: DateTime<Utc>) -> Result<Vec<Drop>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {DROP_COLUMNS} FROM drops
             WHERE claim_window_start > ?1
             ORDER BY claim_window_start ASC"
        ))?;
        let rows = stmt.query_map(params![encode_ts(&now)], row_to_drop)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Overwrite every mutable column of `drop`.  Returns `true` if the row
    /// existed.
    pub fn update_drop(&self, drop: &Drop) -> Result<bool> {
        let affected = self.conn().execute(
            "UPDATE drops
             SET title = ?2, description = ?3, stock = ?4,
                 claim_window_start = ?5, claim_window_end = ?6
             WHERE id = ?1",
            params![
                drop.id.to_string(),
                drop.title,
                drop.description,
                drop.stock,
                encode_ts(&drop.claim_window_start),
                encode_ts(&drop.claim_window_end),
            ],
        )?;
        Ok(affected > 0)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a drop by UUID.  Returns `true` if a row was deleted.
    ///
    /// Waitlist entries go with it (ON DELETE CASCADE); existing claims make
    /// the delete fail with a foreign-key error.
    pub fn delete_drop(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM drops WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Drop`].
fn row_to_drop(row: &rusqlite::Row<'_>) -> rusqlite::Result<Drop> {
    let id_str: String = row.get(0)?;
    let title: String = row.get(1)?;
    let description: Option<String> = row.get(2)?;
    let stock: i64 = row.get(3)?;
    let start_str: String = row.get(4)?;
    let end_str: String = row.get(5)?;
    let created_str: String = row.get(6)?;

    Ok(Drop {
        id: decode_uuid(0, &id_str)?,
        title,
        description,
        stock,
        claim_window_start: decode_ts(4, &start_str)?,
        claim_window_end: decode_ts(5, &end_str)?,
        created_at: decode_ts(6, &created_str)?,
    })
}

//! Waitlist persistence and priority-ordered ranking.
//!
//! Rank order is `priority_score DESC, joined_at ASC, rowid ASC`.  The last
//! key only matters when two entries share a score and a microsecond, and
//! falls back to insertion order.

use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use dropspot_shared::UserId;

use crate::codec::{decode_ts, decode_user_id, decode_uuid, encode_ts};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::WaitlistEntry;

const ENTRY_COLUMNS: &str = "id, user_id, drop_id, priority_score, joined_at";

impl Database {
    pub fn insert_waitlist_entry(&self, entry: &WaitlistEntry) -> Result<()> {
        self.conn().execute(
            "INSERT INTO waitlist (id, user_id, drop_id, priority_score, joined_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.id.to_string(),
                entry.user_id.to_string(),
                entry.drop_id.to_string(),
                entry.priority_score,
                encode_ts(&entry.joined_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_waitlist_entry(
        &self,
        user_id: UserId,
        drop_id: Uuid,
    ) -> Result<Option<WaitlistEntry>> {
        self.conn()
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM waitlist WHERE user_id = ?1 AND drop_id = ?2"),
                params![user_id.to_string(), drop_id.to_string()],
                row_to_entry,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }

    /// Returns `true` if an entry was removed.
    pub fn delete_waitlist_entry(&self, user_id: UserId, drop_id: Uuid) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM waitlist WHERE user_id = ?1 AND drop_id = ?2",
            params![user_id.to_string(), drop_id.to_string()],
        )?;
        Ok(affected > 0)
    }

    /// 1-indexed rank of the user's entry, or `None` if they have none.
    pub fn waitlist_position(&self, user_id: UserId, drop_id: Uuid) -> Result<Option<u64>> {
        let me: Option<(i64, String, i64)> = self
            .conn()
            .query_row(
                "SELECT priority_score, joined_at, rowid
                 FROM waitlist WHERE user_id = ?1 AND drop_id = ?2",
                params![user_id.to_string(), drop_id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((score, joined_at, rowid)) = me else {
            return Ok(None);
        };

        let ahead: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM waitlist
             WHERE drop_id = ?1
               AND (priority_score > ?2
                    OR (priority_score = ?2 AND joined_at < ?3)
                    OR (priority_score = ?2 AND joined_at = ?3 AND rowid < ?4))",
            params![drop_id.to_string(), score, joined_at, rowid],
            |row| row.get(0),
        )?;

        Ok(Some(ahead as u64 + 1))
    }

    /// Every entry for a drop in rank order.
    pub fn list_waitlist_for_drop(&self, drop_id: Uuid) -> Result<Vec<WaitlistEntry>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM waitlist
             WHERE drop_id = ?1
             ORDER BY priority_score DESC, joined_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map(params![drop_id.to_string()], row_to_entry)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Every entry a user holds, most recently joined first.
    pub fn list_waitlist_for_user(&self, user_id: UserId) -> Result<Vec<WaitlistEntry>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM waitlist
             WHERE user_id = ?1
             ORDER BY joined_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params![user_id.to_string()], row_to_entry)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub fn count_waitlist(&self, drop_id: Uuid) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM waitlist WHERE drop_id = ?1",
            params![drop_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<WaitlistEntry> {
    let id_str: String = row.get(0)?;
    let user_str: String = row.get(1)?;
    let drop_str: String = row.get(2)?;
    let priority_score: i64 = row.get(3)?;
    let joined_str: String = row.get(4)?;

    Ok(WaitlistEntry {
        id: decode_uuid(0, &id_str)?,
        user_id: decode_user_id(1, &user_str)?,
        drop_id: decode_uuid(2, &drop_str)?,
        priority_score,
        joined_at: decode_ts(4, &joined_str)?,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::test_utils::{identity, open_drop};

    use super::*;

    fn entry_for(db: &Database, drop_id: Uuid, score: i64, offset_ms: i64) -> WaitlistEntry {
        let who = identity(10);
        db.ensure_user(&who).unwrap();
        let base = db.get_drop(drop_id).unwrap().created_at;
        let entry = WaitlistEntry {
            id: Uuid::new_v4(),
            user_id: who.user_id,
            drop_id,
            priority_score: score,
            joined_at: base + Duration::milliseconds(offset_ms),
        };
        db.insert_waitlist_entry(&entry).unwrap();
        entry
    }

    #[test]
    fn rank_by_score_then_join_time() {
        let db = Database::open_in_memory().unwrap();
        let drop = open_drop(3);
        db.insert_drop(&drop).unwrap();

        let first = entry_for(&db, drop.id, 1005, 0);
        let second = entry_for(&db, drop.id, 1010, 10);
        let third = entry_for(&db, drop.id, 1005, 20);

        let ordered: Vec<_> = db
            .list_waitlist_for_drop(drop.id)
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(ordered, vec![second.id, first.id, third.id]);

        assert_eq!(db.waitlist_position(second.user_id, drop.id).unwrap(), Some(1));
        assert_eq!(db.waitlist_position(first.user_id, drop.id).unwrap(), Some(2));
        assert_eq!(db.waitlist_position(third.user_id, drop.id).unwrap(), Some(3));
        assert_eq!(db.waitlist_position(UserId::new(), drop.id).unwrap(), None);
    }

    #[test]
    fn identical_score_and_time_fall_back_to_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        let drop = open_drop(3);
        db.insert_drop(&drop).unwrap();

        let a = entry_for(&db, drop.id, 1000, 0);
        let b = entry_for(&db, drop.id, 1000, 0);

        assert_eq!(db.waitlist_position(a.user_id, drop.id).unwrap(), Some(1));
        assert_eq!(db.waitlist_position(b.user_id, drop.id).unwrap(), Some(2));
    }

    #[test]
    fn unique_per_user_and_drop() {
        let db = Database::open_in_memory().unwrap();
        let drop = open_drop(3);
        db.insert_drop(&drop).unwrap();

        let entry = entry_for(&db, drop.id, 1000, 0);
        let duplicate = WaitlistEntry {
            id: Uuid::new_v4(),
            ..entry.clone()
        };
        assert!(db.insert_waitlist_entry(&duplicate).is_err());
        assert_eq!(db.count_waitlist(drop.id).unwrap(), 1);
    }

    #[test]
    fn delete_cascades_with_drop() {
        let db = Database::open_in_memory().unwrap();
        let drop = open_drop(3);
        db.insert_drop(&drop).unwrap();
        let entry = entry_for(&db, drop.id, 1000, 0);

        assert!(db.delete_drop(drop.id).unwrap());
        assert!(db
            .find_waitlist_entry(entry.user_id, drop.id)
            .unwrap()
            .is_none());
    }

    #[test]
    fn delete_entry_reports_whether_it_existed() {
        let db = Database::open_in_memory().unwrap();
        let drop = open_drop(3);
        db.insert_drop(&drop).unwrap();
        let entry = entry_for(&db, drop.id, 1000, 0);

        assert!(db.delete_waitlist_entry(entry.user_id, drop.id).unwrap());
        assert!(!db.delete_waitlist_entry(entry.user_id, drop.id).unwrap());
        assert!(db.list_waitlist_for_user(entry.user_id).unwrap().is_empty());
    }
}

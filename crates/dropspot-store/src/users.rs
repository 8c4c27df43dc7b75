//! Identity records for users the core has interacted with.

use rusqlite::params;

use dropspot_shared::{Identity, UserId};

use crate::codec::{decode_ts, decode_user_id, encode_ts};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::UserRecord;

impl Database {
    /// Record `identity` if it is not already known.  Returns `true` when a
    /// row was inserted.  An existing row is never rewritten.
    pub fn ensure_user(&self, identity: &Identity) -> Result<bool> {
        let affected = self.conn().execute(
            "INSERT OR IGNORE INTO users (id, created_at) VALUES (?1, ?2)",
            params![
                identity.user_id.to_string(),
                encode_ts(&identity.account_created_at),
            ],
        )?;
        Ok(affected > 0)
    }

    pub fn get_user(&self, id: UserId) -> Result<UserRecord> {
        self.conn()
            .query_row(
                "SELECT id, created_at FROM users WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    let id_str: String = row.get(0)?;
                    let created_str: String = row.get(1)?;
                    Ok(UserRecord {
                        id: decode_user_id(0, &id_str)?,
                        created_at: decode_ts(1, &created_str)?,
                    })
                },
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }
}

#[cfg(test)]
mod tests {
    use crate::test_utils::identity;

    use super::*;

    #[test]
    fn ensure_user_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let who = identity(40);

        assert!(db.ensure_user(&who).unwrap());
        assert!(!db.ensure_user(&who).unwrap());

        let stored = db.get_user(who.user_id).unwrap();
        assert_eq!(stored.created_at, who.account_created_at);
    }

    #[test]
    fn unknown_user_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.get_user(UserId::new()),
            Err(StoreError::NotFound)
        ));
    }
}

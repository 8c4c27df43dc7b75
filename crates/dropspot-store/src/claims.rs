//! Claim persistence.
//!
//! Uniqueness of `(user_id, drop_id)` and of `claim_code` is enforced by the
//! schema as well; the helpers here let the engine check both before it
//! inserts so that it can answer with a domain error instead of a constraint
//! violation.

use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use dropspot_shared::UserId;

use crate::codec::{decode_claim_code, decode_ts, decode_user_id, decode_uuid, encode_ts};
use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Claim;

const CLAIM_COLUMNS: &str = "id, user_id, drop_id, claim_code, claimed_at";

impl Database {
    pub fn insert_claim(&self, claim: &Claim) -> Result<()> {
        self.conn().execute(
            "INSERT INTO claims (id, user_id, drop_id, claim_code, claimed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                claim.id.to_string(),
                claim.user_id.to_string(),
                claim.drop_id.to_string(),
                claim.claim_code.as_str(),
                encode_ts(&claim.claimed_at),
            ],
        )?;
        Ok(())
    }

    pub fn find_claim(&self, user_id: UserId, drop_id: Uuid) -> Result<Option<Claim>> {
        self.conn()
            .query_row(
                &format!("SELECT {CLAIM_COLUMNS} FROM claims WHERE user_id = ?1 AND drop_id = ?2"),
                params![user_id.to_string(), drop_id.to_string()],
                row_to_claim,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }

    pub fn find_claim_by_code(&self, code: &str) -> Result<Option<Claim>> {
        self.conn()
            .query_row(
                &format!("SELECT {CLAIM_COLUMNS} FROM claims WHERE claim_code = ?1"),
                params![code],
                row_to_claim,
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }

    pub fn claim_code_exists(&self, code: &str) -> Result<bool> {
        let exists: bool = self.conn().query_row(
            "SELECT EXISTS (SELECT 1 FROM claims WHERE claim_code = ?1)",
            params![code],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Number of claims issued for a drop.
    pub fn count_claims_for_drop(&self, drop_id: Uuid) -> Result<i64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM claims WHERE drop_id = ?1",
            params![drop_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Claims for a drop in issue order.
    pub fn list_claims_for_drop(&self, drop_id: Uuid) -> Result<Vec<Claim>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CLAIM_COLUMNS} FROM claims
             WHERE drop_id = ?1
             ORDER BY claimed_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map(params![drop_id.to_string()], row_to_claim)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// A user's claims, newest first.
    pub fn list_claims_for_user(&self, user_id: UserId) -> Result<Vec<Claim>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CLAIM_COLUMNS} FROM claims
             WHERE user_id = ?1
             ORDER BY claimed_at DESC, rowid DESC"
        ))?;
        let rows = stmt.query_map(params![user_id.to_string()], row_to_claim)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Administrative purge.  Returns `true` if a row was deleted.
    pub fn delete_claim(&self, id: Uuid) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM claims WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }
}

fn row_to_claim(row: &rusqlite::Row<'_>) -> rusqlite::Result<Claim> {
    let id_str: String = row.get(0)?;
    let user_str: String = row.get(1)?;
    let drop_str: String = row.get(2)?;
    let code: String = row.get(3)?;
    let claimed_str: String = row.get(4)?;

    Ok(Claim {
        id: decode_uuid(0, &id_str)?,
        user_id: decode_user_id(1, &user_str)?,
        drop_id: decode_uuid(2, &drop_str)?,
        claim_code: decode_claim_code(3, code)?,
        claimed_at: decode_ts(4, &claimed_str)?,
    })
}

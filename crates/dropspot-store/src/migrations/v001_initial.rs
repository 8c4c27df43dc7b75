//! v001 -- Initial schema creation.
//!
//! Creates the four core tables: `users`, `drops`, `waitlist` and `claims`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users (identity only; owned by the authentication collaborator)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id         TEXT PRIMARY KEY NOT NULL,     -- UUID
    created_at TEXT NOT NULL                  -- RFC-3339, microseconds, UTC
);

-- ----------------------------------------------------------------
-- Drops
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS drops (
    id                 TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    title              TEXT NOT NULL,
    description        TEXT,
    stock              INTEGER NOT NULL CHECK (stock >= 0),
    claim_window_start TEXT NOT NULL,
    claim_window_end   TEXT NOT NULL,
    created_at         TEXT NOT NULL,

    CHECK (claim_window_end > claim_window_start)
);

CREATE INDEX IF NOT EXISTS idx_drops_window
    ON drops(claim_window_start, claim_window_end);

-- ----------------------------------------------------------------
-- Waitlist
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS waitlist (
    id             TEXT PRIMARY KEY NOT NULL,  -- UUID v4
    user_id        TEXT NOT NULL,              -- FK -> users(id)
    drop_id        TEXT NOT NULL,              -- FK -> drops(id)
    priority_score INTEGER NOT NULL,
    joined_at      TEXT NOT NULL,

    UNIQUE (user_id, drop_id),
    FOREIGN KEY (user_id) REFERENCES users(id),
    FOREIGN KEY (drop_id) REFERENCES drops(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_waitlist_rank
    ON waitlist(drop_id, priority_score DESC, joined_at ASC);

-- ----------------------------------------------------------------
-- Claims (no cascade: a drop with claims cannot be deleted)
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS claims (
    id         TEXT PRIMARY KEY NOT NULL,      -- UUID v4
    user_id    TEXT NOT NULL,                  -- FK -> users(id)
    drop_id    TEXT NOT NULL,                  -- FK -> drops(id)
    claim_code TEXT NOT NULL UNIQUE,           -- XXXX-XXXX-XXXX
    claimed_at TEXT NOT NULL,

    UNIQUE (user_id, drop_id),
    FOREIGN KEY (user_id) REFERENCES users(id),
    FOREIGN KEY (drop_id) REFERENCES drops(id)
);

CREATE INDEX IF NOT EXISTS idx_claims_drop ON claims(drop_id, claimed_at);
CREATE INDEX IF NOT EXISTS idx_claims_user ON claims(user_id, claimed_at DESC);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}

//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use rusqlite::Connection;

use crate::error::{Result, StoreError};
use crate::migrations;

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the default application database.
    ///
    /// The database file is placed in the platform-appropriate data directory:
    /// - Linux:   `~/.local/share/dropspot/dropspot.db`
    /// - macOS:   `~/Library/Application Support/com.dropspot.dropspot/dropspot.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\dropspot\dropspot\data\dropspot.db`
    pub fn new() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("com", "dropspot", "dropspot").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        let db_path = data_dir.join("dropspot.db");

        tracing::info!(path = %db_path.display(), "opening database");

        Self::open_at(&db_path)
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Self::init(conn)
    }

    /// Open a private in-memory database. Used by tests and tooling.
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        // Cascade from drops to waitlist relies on this.
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(Duration::from_secs(5))?;

        migrations::run_migrations(&conn)?;

        Ok(Self { conn })
    }

    /// Return a reference to the underlying `rusqlite::Connection`.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        self.conn.path().map(PathBuf::from)
    }

    /// Run `work` inside a `BEGIN IMMEDIATE` transaction.
    ///
    /// The write lock is taken up front, so every read `work` performs sees
    /// the state it will commit against. Commits when `work` returns `Ok`,
    /// rolls back when it returns `Err`.
    pub fn transaction<T, E, F>(&self, work: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&Database) -> std::result::Result<T, E>,
        E: From<StoreError>,
    {
        // A unit of work that panicked mid-way leaves its transaction open.
        if !self.conn.is_autocommit() {
            tracing::warn!("rolling back transaction left open by an aborted unit of work");
            self.conn
                .execute_batch("ROLLBACK")
                .map_err(StoreError::from)?;
        }

        self.conn
            .execute_batch("BEGIN IMMEDIATE")
            .map_err(StoreError::from)?;

        match work(self) {
            Ok(value) => {
                if let Err(e) = self.conn.execute_batch("COMMIT") {
                    self.rollback_quietly();
                    return Err(StoreError::from(e).into());
                }
                Ok(value)
            }
            Err(e) => {
                self.rollback_quietly();
                Err(e)
            }
        }
    }

    fn rollback_quietly(&self) {
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            tracing::warn!(error = %e, "rollback failed");
        }
    }
}

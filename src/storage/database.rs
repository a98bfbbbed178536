//! SQLite Database
//!
//! Embedded database for persistent research state using rusqlite with r2d2
//! connection pooling. Three tables, each keyed by (user id, subject id):
//! the progress grid, the milestone flags, and the committed thesis. Grid
//! and flags are stored as JSON text; the thesis row is flat columns with a
//! string-backed stance.

use std::path::Path;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use conviction_research::{MilestoneSet, ProgressRecord, ThesisRecord, ThesisStance};

use crate::utils::error::{AppError, AppResult};

/// Type alias for the connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Database service for managing SQLite operations
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Create a new database instance with connection pooling
    pub fn new(db_path: impl AsRef<Path>) -> AppResult<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::database(format!("Failed to create db directory: {}", e)))?;
        }

        let manager = SqliteConnectionManager::file(db_path);
        let pool = Pool::builder()
            .max_size(10)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database for testing.
    ///
    /// Same schema as the production database; the pool is capped at one
    /// connection so every caller sees the same in-memory instance.
    pub fn new_in_memory() -> AppResult<Self> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| AppError::database(format!("Failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize the database schema
    fn init_schema(&self) -> AppResult<()> {
        let conn = self.get_connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS progress_records (
                user_id TEXT NOT NULL,
                subject_id TEXT NOT NULL,
                grid TEXT NOT NULL DEFAULT '{}',
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (user_id, subject_id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS milestones (
                user_id TEXT NOT NULL,
                subject_id TEXT NOT NULL,
                flags TEXT NOT NULL DEFAULT '{}',
                updated_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (user_id, subject_id)
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS thesis_records (
                user_id TEXT NOT NULL,
                subject_id TEXT NOT NULL,
                stance TEXT NOT NULL,
                custom_text TEXT,
                saved_at TEXT NOT NULL,
                PRIMARY KEY (user_id, subject_id)
            )",
            [],
        )?;

        Ok(())
    }

    /// Get a connection from the pool
    pub fn get_connection(&self) -> AppResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| AppError::database(format!("Failed to get connection: {}", e)))
    }

    /// Check if the database is healthy
    pub fn is_healthy(&self) -> bool {
        if let Ok(conn) = self.pool.get() {
            conn.query_row("SELECT 1", [], |_| Ok(())).is_ok()
        } else {
            false
        }
    }

    // ========================================================================
    // Progress Records
    // ========================================================================

    /// Get the progress record for a (user, subject) pair
    pub fn get_progress(
        &self,
        user_id: &str,
        subject_id: &str,
    ) -> AppResult<Option<ProgressRecord>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            "SELECT grid FROM progress_records WHERE user_id = ?1 AND subject_id = ?2",
            params![user_id, subject_id],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(grid) => Ok(Some(serde_json::from_str(&grid)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    /// Insert or replace the progress record for a (user, subject) pair
    pub fn upsert_progress(
        &self,
        user_id: &str,
        subject_id: &str,
        record: &ProgressRecord,
    ) -> AppResult<()> {
        let grid = serde_json::to_string(record)?;
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO progress_records (user_id, subject_id, grid, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(user_id, subject_id)
             DO UPDATE SET grid = ?3, updated_at = datetime('now')",
            params![user_id, subject_id, grid],
        )?;
        Ok(())
    }

    // ========================================================================
    // Milestones
    // ========================================================================

    /// Get the milestone flags for a (user, subject) pair
    pub fn get_milestones(
        &self,
        user_id: &str,
        subject_id: &str,
    ) -> AppResult<Option<MilestoneSet>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            "SELECT flags FROM milestones WHERE user_id = ?1 AND subject_id = ?2",
            params![user_id, subject_id],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(flags) => Ok(Some(serde_json::from_str(&flags)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    /// Insert or replace the milestone flags for a (user, subject) pair
    pub fn upsert_milestones(
        &self,
        user_id: &str,
        subject_id: &str,
        milestones: &MilestoneSet,
    ) -> AppResult<()> {
        let flags = serde_json::to_string(milestones)?;
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO milestones (user_id, subject_id, flags, updated_at)
             VALUES (?1, ?2, ?3, datetime('now'))
             ON CONFLICT(user_id, subject_id)
             DO UPDATE SET flags = ?3, updated_at = datetime('now')",
            params![user_id, subject_id, flags],
        )?;
        Ok(())
    }

    // ========================================================================
    // Thesis Records
    // ========================================================================

    /// Get the live thesis record for a (user, subject) pair
    pub fn get_thesis(&self, user_id: &str, subject_id: &str) -> AppResult<Option<ThesisRecord>> {
        let conn = self.get_connection()?;
        let result = conn.query_row(
            "SELECT stance, custom_text, saved_at FROM thesis_records
             WHERE user_id = ?1 AND subject_id = ?2",
            params![user_id, subject_id],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        );

        match result {
            Ok((stance, custom_text, saved_at)) => {
                let stance = ThesisStance::parse(&stance)
                    .map_err(|e| AppError::database(e.to_string()))?;
                let saved_at = saved_at
                    .parse::<chrono::DateTime<chrono::Utc>>()
                    .map_err(|e| AppError::database(format!("Invalid saved_at: {}", e)))?;
                Ok(Some(ThesisRecord {
                    stance,
                    custom_text,
                    saved_at,
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::database(e.to_string())),
        }
    }

    /// Insert or overwrite the thesis record for a (user, subject) pair.
    ///
    /// Upsert by key: exactly one live row per pair, a new save replaces the
    /// prior one.
    pub fn upsert_thesis(
        &self,
        user_id: &str,
        subject_id: &str,
        record: &ThesisRecord,
    ) -> AppResult<()> {
        let conn = self.get_connection()?;
        conn.execute(
            "INSERT INTO thesis_records (user_id, subject_id, stance, custom_text, saved_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, subject_id)
             DO UPDATE SET stance = ?3, custom_text = ?4, saved_at = ?5",
            params![
                user_id,
                subject_id,
                record.stance.as_str(),
                record.custom_text,
                record.saved_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

//! Database layer for promptloops.
//!
//! Provides a `Database` struct that owns the SQLite connection and hands
//! out the comparison store.

mod comparisons;

pub use comparisons::{ComparisonRow, ComparisonSummary, Comparisons};

use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::Mutex;

/// The main database struct that owns the SQLite connection.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the default location.
    ///
    /// The default location is `~/.local/share/promptloops/promptloops.db`.
    pub fn open() -> Result<Self, rusqlite::Error> {
        Self::open_at(&Self::default_path())
    }

    /// Open or create a database at a specific path, creating parent directories.
    pub fn open_at(path: &std::path::Path) -> Result<Self, rusqlite::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("promptloops")
            .join("promptloops.db")
    }

    /// Access the comparisons store.
    pub fn comparisons(&self) -> Comparisons<'_> {
        let conn = self.conn.lock().expect("Database lock poisoned");
        Comparisons::new(conn)
    }

    fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS comparisons (
                comparison_id TEXT PRIMARY KEY,
                run_id TEXT NOT NULL,
                created_at TEXT NOT NULL,
                variant TEXT NOT NULL,
                temp_mode TEXT NOT NULL,
                threshold_mode TEXT NOT NULL,
                user_input TEXT NOT NULL,
                route TEXT NOT NULL,
                temperature_used REAL NOT NULL,
                rewrite_threshold_used INTEGER,
                rewritten INTEGER NOT NULL,
                original_prompt TEXT NOT NULL,
                original_response TEXT NOT NULL,
                original_critique TEXT NOT NULL,
                original_heuristic TEXT NOT NULL,
                enhanced_prompt TEXT NOT NULL,
                enhanced_response TEXT NOT NULL,
                enhanced_critique TEXT NOT NULL,
                enhanced_heuristic TEXT NOT NULL,
                generative_verdict TEXT NOT NULL,
                heuristic_verdict TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_comparisons_run_id ON comparisons(run_id);
            CREATE INDEX IF NOT EXISTS idx_comparisons_created_at ON comparisons(created_at DESC);
            "#,
        )
    }
}

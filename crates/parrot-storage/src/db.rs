//! Database connection management.
//!
//! Wraps a single rusqlite Connection in a Mutex and configures WAL mode
//! and foreign keys on initialization.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use parrot_core::error::ParrotError;

use crate::migrations;

/// SQLite database handle.
///
/// Opened once by the binary and passed explicitly to repositories.
/// `rusqlite::Connection` is `Send` but not `Sync`; the Mutex makes the
/// handle shareable behind an `Arc`.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database at the given path.
    ///
    /// Creates the parent directory, configures pragmas, and runs all
    /// pending migrations.
    pub fn new(path: &Path) -> Result<Self, ParrotError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| ParrotError::Storage(format!("Failed to open database: {}", e)))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;",
        )
        .map_err(|e| ParrotError::Storage(format!("Failed to set pragmas: {}", e)))?;

        info!("Database opened at {}", path.display());

        Self::with_migrations(conn)
    }

    /// Open an in-memory database (for testing).
    pub fn in_memory() -> Result<Self, ParrotError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ParrotError::Storage(format!("Failed to open in-memory db: {}", e)))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| ParrotError::Storage(format!("Failed to set pragmas: {}", e)))?;

        Self::with_migrations(conn)
    }

    fn with_migrations(conn: Connection) -> Result<Self, ParrotError> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Execute a closure with a reference to the underlying connection.
    ///
    /// The mutex is held for the duration of the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, ParrotError>
    where
        F: FnOnce(&Connection) -> Result<T, ParrotError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ParrotError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}

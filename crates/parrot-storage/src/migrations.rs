//! Database schema migrations.
//!
//! Applies the chat schema: chat_sessions, chat_messages, and the
//! schema_migrations bookkeeping table.

use rusqlite::Connection;
use tracing::info;

use parrot_core::error::ParrotError;

/// Current time as epoch milliseconds, evaluated by SQLite.
pub(crate) const NOW_MS: &str =
    "(CAST(strftime('%s', 'now') AS INTEGER) * 1000 + CAST(substr(strftime('%f', 'now'), 4) AS INTEGER))";

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), ParrotError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| ParrotError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version = current_version(conn)?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: chat_schema");
    }

    Ok(())
}

/// Highest applied migration version, or 0 for a fresh database.
pub fn current_version(conn: &Connection) -> Result<i64, ParrotError> {
    conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )
    .map_err(|e| ParrotError::Storage(format!("Failed to query migration version: {}", e)))
}

/// Version 1: chat sessions and messages.
///
/// Messages are ordered by a per-session `sequence` rather than by
/// `created_at`, which can collide for inserts within one clock tick.
fn apply_v1(conn: &Connection) -> Result<(), ParrotError> {
    let sql = format!(
        "
        CREATE TABLE IF NOT EXISTS chat_sessions (
            id          TEXT PRIMARY KEY NOT NULL,
            title       TEXT,
            created_at  INTEGER NOT NULL DEFAULT {now},
            updated_at  INTEGER NOT NULL DEFAULT {now}
        );

        CREATE INDEX IF NOT EXISTS idx_chat_sessions_updated
            ON chat_sessions (updated_at DESC);

        CREATE TABLE IF NOT EXISTS chat_messages (
            id          TEXT PRIMARY KEY NOT NULL,
            session_id  TEXT NOT NULL,
            sequence    INTEGER NOT NULL,
            sender      TEXT NOT NULL,
            raw_content TEXT NOT NULL,
            created_at  INTEGER NOT NULL DEFAULT {now},
            FOREIGN KEY (session_id) REFERENCES chat_sessions(id) ON DELETE CASCADE,
            CONSTRAINT uq_chat_messages_session_sequence UNIQUE (session_id, sequence)
        );

        -- Renaming a session counts as an update.
        CREATE TRIGGER IF NOT EXISTS trg_chat_sessions_touch_on_title
            AFTER UPDATE OF title ON chat_sessions
        BEGIN
            UPDATE chat_sessions SET updated_at = {now} WHERE id = NEW.id;
        END;

        -- So does adding a message to it.
        CREATE TRIGGER IF NOT EXISTS trg_chat_messages_touch_session
            AFTER INSERT ON chat_messages
        BEGIN
            UPDATE chat_sessions SET updated_at = {now} WHERE id = NEW.session_id;
        END;

        INSERT INTO schema_migrations (version, name) VALUES (1, 'chat_schema');
        ",
        now = NOW_MS
    );

    conn.execute_batch(&sql)
        .map_err(|e| ParrotError::Storage(format!("Migration v1 failed: {}", e)))
}

//! Chat session repository backed by SQLite.
//!
//! Every method commits on its own; there is no transaction spanning
//! several calls, so bulk operations are not atomic.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use uuid::Uuid;

use parrot_core::error::ParrotError;

use crate::db::Database;

/// A persisted chat session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A persisted chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    /// 1-based position within the session.
    pub sequence: i64,
    pub sender: String,
    pub raw_content: String,
    pub created_at: DateTime<Utc>,
}

const SESSION_COLUMNS: &str = "id, title, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, session_id, sequence, sender, raw_content, created_at";

/// Repository for chat sessions and their messages.
#[derive(Debug, Clone)]
pub struct ChatRepository {
    db: Arc<Database>,
}

impl ChatRepository {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Create and persist a session, generating an id when none is given.
    pub fn create_session(
        &self,
        title: Option<&str>,
        id: Option<Uuid>,
    ) -> Result<ChatSession, ParrotError> {
        let id = id.unwrap_or_else(Uuid::new_v4);
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_sessions (id, title) VALUES (?1, ?2)",
                rusqlite::params![id.to_string(), title],
            )
            .map_err(|e| ParrotError::Storage(format!("Failed to create session: {}", e)))?;

            fetch_session(conn, id)?.ok_or_else(|| {
                ParrotError::Storage(format!("Session {} vanished after insert", id))
            })
        })
    }

    /// Find a session by ID.
    pub fn get_session(&self, id: Uuid) -> Result<Option<ChatSession>, ParrotError> {
        self.db.with_conn(|conn| fetch_session(conn, id))
    }

    /// List sessions, most recently updated first.
    pub fn list_sessions(&self, limit: u64, offset: u64) -> Result<Vec<ChatSession>, ParrotError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM chat_sessions
                     ORDER BY updated_at DESC, rowid DESC
                     LIMIT ?1 OFFSET ?2",
                    SESSION_COLUMNS
                ))
                .map_err(|e| ParrotError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![limit as i64, offset as i64], |row| {
                    Ok(row_to_session(row))
                })
                .map_err(|e| ParrotError::Storage(e.to_string()))?;

            let mut sessions = Vec::new();
            for row in rows {
                let session = row.map_err(|e| ParrotError::Storage(e.to_string()))??;
                sessions.push(session);
            }
            Ok(sessions)
        })
    }

    /// Set a session's title. Returns `None` if the session does not exist.
    pub fn update_session_title(
        &self,
        id: Uuid,
        title: &str,
    ) -> Result<Option<ChatSession>, ParrotError> {
        self.db.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE chat_sessions SET title = ?1 WHERE id = ?2",
                    rusqlite::params![title, id.to_string()],
                )
                .map_err(|e| ParrotError::Storage(format!("Failed to rename session: {}", e)))?;
            if changed == 0 {
                return Ok(None);
            }
            fetch_session(conn, id)
        })
    }

    /// Delete a session and, through the cascade, all of its messages.
    ///
    /// Returns `true` if a session was deleted.
    pub fn delete_session(&self, id: Uuid) -> Result<bool, ParrotError> {
        self.db.with_conn(|conn| {
            let deleted = conn
                .execute(
                    "DELETE FROM chat_sessions WHERE id = ?1",
                    rusqlite::params![id.to_string()],
                )
                .map_err(|e| ParrotError::Storage(format!("Failed to delete session: {}", e)))?;
            Ok(deleted > 0)
        })
    }

    /// Count all sessions.
    pub fn count_sessions(&self) -> Result<u64, ParrotError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM chat_sessions", [], |row| row.get(0))
                .map_err(|e| ParrotError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }

    // ------------------------------------------------------------------
    // Messages
    // ------------------------------------------------------------------

    /// Append a message to a session.
    ///
    /// The message gets the next sequence number of its session. An unknown
    /// `session_id` fails with a foreign key violation.
    pub fn add_message(
        &self,
        session_id: Uuid,
        sender: &str,
        raw_content: &str,
    ) -> Result<ChatMessage, ParrotError> {
        let id = Uuid::new_v4();
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chat_messages (id, session_id, sequence, sender, raw_content)
                 VALUES (
                    ?1,
                    ?2,
                    (SELECT COALESCE(MAX(sequence), 0) + 1 FROM chat_messages WHERE session_id = ?2),
                    ?3,
                    ?4
                 )",
                rusqlite::params![id.to_string(), session_id.to_string(), sender, raw_content],
            )
            .map_err(|e| ParrotError::Storage(format!("Failed to add message: {}", e)))?;

            fetch_message(conn, id)?.ok_or_else(|| {
                ParrotError::Storage(format!("Message {} vanished after insert", id))
            })
        })
    }

    /// Find a message by ID.
    pub fn get_message(&self, id: Uuid) -> Result<Option<ChatMessage>, ParrotError> {
        self.db.with_conn(|conn| fetch_message(conn, id))
    }

    /// All messages of a session in sequence order.
    pub fn get_session_messages(&self, session_id: Uuid) -> Result<Vec<ChatMessage>, ParrotError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {} FROM chat_messages
                     WHERE session_id = ?1
                     ORDER BY sequence ASC",
                    MESSAGE_COLUMNS
                ))
                .map_err(|e| ParrotError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![session_id.to_string()], |row| {
                    Ok(row_to_message(row))
                })
                .map_err(|e| ParrotError::Storage(e.to_string()))?;

            let mut messages = Vec::new();
            for row in rows {
                let message = row.map_err(|e| ParrotError::Storage(e.to_string()))??;
                messages.push(message);
            }
            Ok(messages)
        })
    }

    /// Replace a message's content. Returns `None` if the message does not exist.
    pub fn update_message(
        &self,
        id: Uuid,
        raw_content: &str,
    ) -> Result<Option<ChatMessage>, ParrotError> {
        self.db.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE chat_messages SET raw_content = ?1 WHERE id = ?2",
                    rusqlite::params![raw_content, id.to_string()],
                )
                .map_err(|e| ParrotError::Storage(format!("Failed to update message: {}", e)))?;
            if changed == 0 {
                return Ok(None);
            }
            fetch_message(conn, id)
        })
    }

    /// Delete a single message. Returns `true` if it existed.
    pub fn delete_message(&self, id: Uuid) -> Result<bool, ParrotError> {
        self.db.with_conn(|conn| {
            let deleted = conn
                .execute(
                    "DELETE FROM chat_messages WHERE id = ?1",
                    rusqlite::params![id.to_string()],
                )
                .map_err(|e| ParrotError::Storage(format!("Failed to delete message: {}", e)))?;
            Ok(deleted > 0)
        })
    }

    /// Delete every message of a session, keeping the session. Returns the count.
    pub fn delete_session_messages(&self, session_id: Uuid) -> Result<usize, ParrotError> {
        self.db.with_conn(|conn| {
            conn.execute(
                "DELETE FROM chat_messages WHERE session_id = ?1",
                rusqlite::params![session_id.to_string()],
            )
            .map_err(|e| ParrotError::Storage(format!("Failed to delete messages: {}", e)))
        })
    }

    // ------------------------------------------------------------------
    // Bulk
    // ------------------------------------------------------------------

    /// Create a session and append `(sender, raw_content)` pairs to it in order.
    pub fn save_conversation(
        &self,
        messages: &[(String, String)],
        title: Option<&str>,
        session_id: Option<Uuid>,
    ) -> Result<ChatSession, ParrotError> {
        let session = self.create_session(title, session_id)?;
        for (sender, raw_content) in messages {
            self.add_message(session.id, sender, raw_content)?;
        }
        // Re-read so `updated_at` reflects the message inserts.
        Ok(self.get_session(session.id)?.unwrap_or(session))
    }

    /// Load a session together with its messages.
    pub fn load_conversation(
        &self,
        session_id: Uuid,
    ) -> Result<Option<(ChatSession, Vec<ChatMessage>)>, ParrotError> {
        let Some(session) = self.get_session(session_id)? else {
            return Ok(None);
        };
        let messages = self.get_session_messages(session_id)?;
        Ok(Some((session, messages)))
    }
}

// -- Row helpers --

fn fetch_session(conn: &Connection, id: Uuid) -> Result<Option<ChatSession>, ParrotError> {
    let result = conn
        .query_row(
            &format!("SELECT {} FROM chat_sessions WHERE id = ?1", SESSION_COLUMNS),
            rusqlite::params![id.to_string()],
            |row| Ok(row_to_session(row)),
        )
        .optional()
        .map_err(|e| ParrotError::Storage(e.to_string()))?;

    result.transpose()
}

fn fetch_message(conn: &Connection, id: Uuid) -> Result<Option<ChatMessage>, ParrotError> {
    let result = conn
        .query_row(
            &format!("SELECT {} FROM chat_messages WHERE id = ?1", MESSAGE_COLUMNS),
            rusqlite::params![id.to_string()],
            |row| Ok(row_to_message(row)),
        )
        .optional()
        .map_err(|e| ParrotError::Storage(e.to_string()))?;

    result.transpose()
}

fn row_to_session(row: &rusqlite::Row<'_>) -> Result<ChatSession, ParrotError> {
    let id: String = row.get(0).map_err(|e| ParrotError::Storage(e.to_string()))?;
    let title: Option<String> = row.get(1).map_err(|e| ParrotError::Storage(e.to_string()))?;
    let created_at: i64 = row.get(2).map_err(|e| ParrotError::Storage(e.to_string()))?;
    let updated_at: i64 = row.get(3).map_err(|e| ParrotError::Storage(e.to_string()))?;

    Ok(ChatSession {
        id: parse_uuid(&id)?,
        title,
        created_at: millis_to_datetime(created_at),
        updated_at: millis_to_datetime(updated_at),
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> Result<ChatMessage, ParrotError> {
    let id: String = row.get(0).map_err(|e| ParrotError::Storage(e.to_string()))?;
    let session_id: String = row.get(1).map_err(|e| ParrotError::Storage(e.to_string()))?;
    let sequence: i64 = row.get(2).map_err(|e| ParrotError::Storage(e.to_string()))?;
    let sender: String = row.get(3).map_err(|e| ParrotError::Storage(e.to_string()))?;
    let raw_content: String = row.get(4).map_err(|e| ParrotError::Storage(e.to_string()))?;
    let created_at: i64 = row.get(5).map_err(|e| ParrotError::Storage(e.to_string()))?;

    Ok(ChatMessage {
        id: parse_uuid(&id)?,
        session_id: parse_uuid(&session_id)?,
        sequence,
        sender,
        raw_content,
        created_at: millis_to_datetime(created_at),
    })
}

fn parse_uuid(s: &str) -> Result<Uuid, ParrotError> {
    Uuid::parse_str(s).map_err(|e| ParrotError::Storage(format!("Invalid UUID '{}': {}", s, e)))
}

fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

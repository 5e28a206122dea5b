//! Parrot storage crate - SQLite persistence for chat sessions.
//!
//! Provides a WAL-mode SQLite database with migrations and the
//! `ChatRepository` for session and message CRUD.

pub mod db;
pub mod migrations;
pub mod repository;

pub use db::Database;
pub use repository::{ChatMessage, ChatRepository, ChatSession};

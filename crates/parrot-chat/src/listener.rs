//! Observers notified when the conversation changes.

use parrot_core::types::Message;
use parrot_storage::ChatRepository;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ChatError;

/// Receives conversation events synchronously, in registration order.
pub trait ChatEventListener {
    /// Identifies the listener for removal and in logs.
    fn name(&self) -> &str;

    /// Called once per message, after it has been appended in memory.
    fn on_message_added(&self, message: &Message, session_id: Uuid) -> Result<(), ChatError>;
}

/// Writes every message through to the chat repository.
pub struct DbSaveListener {
    repo: ChatRepository,
}

impl DbSaveListener {
    pub const NAME: &'static str = "db-save";

    pub fn new(repo: ChatRepository) -> Self {
        Self { repo }
    }
}

impl ChatEventListener for DbSaveListener {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn on_message_added(&self, message: &Message, session_id: Uuid) -> Result<(), ChatError> {
        let saved = self
            .repo
            .add_message(session_id, message.sender(), message.raw_content())?;
        debug!(
            session_id = %session_id,
            message_id = %saved.id,
            sequence = saved.sequence,
            "Message persisted"
        );
        Ok(())
    }
}

/// Emits a log event per message.
#[derive(Debug, Default)]
pub struct TracingListener;

impl TracingListener {
    pub const NAME: &'static str = "tracing";
}

impl ChatEventListener for TracingListener {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn on_message_added(&self, message: &Message, session_id: Uuid) -> Result<(), ChatError> {
        info!(
            session_id = %session_id,
            sender = message.sender(),
            chars = message.raw_content().chars().count(),
            "Message added"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parrot_storage::Database;

    fn make_repo() -> ChatRepository {
        ChatRepository::new(Arc::new(Database::in_memory().unwrap()))
    }

    #[test]
    fn test_db_save_listener_persists_message() {
        let repo = make_repo();
        let session = repo.create_session(None, None).unwrap();
        let listener = DbSaveListener::new(repo.clone());

        listener
            .on_message_added(&Message::new("You", "What is total revenue?"), session.id)
            .unwrap();
        listener
            .on_message_added(&Message::new("Parrot", "$42,000"), session.id)
            .unwrap();

        let stored = repo.get_session_messages(session.id).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].sender, "You");
        assert_eq!(stored[1].raw_content, "$42,000");
    }

    #[test]
    fn test_db_save_listener_unknown_session_errors() {
        let listener = DbSaveListener::new(make_repo());
        let err = listener
            .on_message_added(&Message::new("You", "hi"), Uuid::new_v4())
            .unwrap_err();
        assert!(matches!(err, ChatError::Storage(_)));
    }

    #[test]
    fn test_listener_names() {
        assert_eq!(DbSaveListener::new(make_repo()).name(), "db-save");
        assert_eq!(TracingListener.name(), "tracing");
    }

    #[test]
    fn test_tracing_listener_never_fails() {
        let listener = TracingListener;
        assert!(listener
            .on_message_added(&Message::new("Error", "boom"), Uuid::new_v4())
            .is_ok());
    }
}

use std::fmt;

use serde::Serialize;

use crate::error::{ParrotError, Result};
use crate::style::StyledText;

/// Sender label for user input.
pub const SENDER_USER: &str = "You";
/// Sender label for agent answers.
pub const SENDER_ASSISTANT: &str = "Parrot";
/// Sender label for processing failures.
pub const SENDER_ERROR: &str = "Error";

// =============================================================================
// Message
// =============================================================================

/// One transcript entry. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    sender: String,
    raw_content: String,
    rendered: StyledText,
}

impl Message {
    /// Build a message, rendering it with the sender's style.
    pub fn new(sender: impl Into<String>, raw_content: impl Into<String>) -> Self {
        let sender = sender.into();
        let raw_content = raw_content.into();
        let rendered = StyledText::for_sender(&sender, &raw_content);
        Self {
            sender,
            raw_content,
            rendered,
        }
    }

    /// Build a message with an explicitly rendered form.
    pub fn with_rendered(
        sender: impl Into<String>,
        raw_content: impl Into<String>,
        rendered: StyledText,
    ) -> Self {
        Self {
            sender: sender.into(),
            raw_content: raw_content.into(),
            rendered,
        }
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn raw_content(&self) -> &str {
        &self.raw_content
    }

    pub fn rendered(&self) -> &StyledText {
        &self.rendered
    }

    /// Export view: `{sender, content}`.
    pub fn to_record(&self) -> MessageRecord<'_> {
        MessageRecord {
            sender: &self.sender,
            content: &self.raw_content,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.sender, self.raw_content)
    }
}

/// Serializable `{sender, content}` pair used by exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageRecord<'a> {
    pub sender: &'a str,
    pub content: &'a str,
}

// =============================================================================
// Conversation
// =============================================================================

/// Ordered, append-only chat transcript.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message to the end of the transcript.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Message at `index`, or `IndexOutOfRange`.
    pub fn get(&self, index: usize) -> Result<&Message> {
        self.messages.get(index).ok_or(ParrotError::IndexOutOfRange {
            index,
            len: self.messages.len(),
        })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.messages.iter()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

impl fmt::Display for Conversation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Conversation: {} messages>", self.messages.len())
    }
}

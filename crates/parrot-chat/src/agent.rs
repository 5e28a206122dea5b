//! Contract for the external agent that answers queries.

use std::fmt;

use crate::error::ChatError;

/// Result of one agent run.
///
/// `content` is the textual answer. When an agent produces no content the
/// processor falls back to the `Display` form of the whole response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AgentResponse {
    pub content: Option<String>,
    pub error: Option<String>,
    pub raw_input: String,
}

impl AgentResponse {
    /// A successful answer.
    pub fn answer(raw_input: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            error: None,
            raw_input: raw_input.into(),
        }
    }

    /// A run that completed but reported a failure.
    pub fn failed(raw_input: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            content: None,
            error: Some(error.into()),
            raw_input: raw_input.into(),
        }
    }
}

impl fmt::Display for AgentResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.content, &self.error) {
            (Some(content), _) => f.write_str(content),
            (None, Some(error)) => write!(f, "AgentResponse(error: {})", error),
            (None, None) => write!(f, "AgentResponse(no content for {:?})", self.raw_input),
        }
    }
}

/// Something that turns a natural-language query into an answer.
///
/// Implementations own their model client and tools; the chat layer only
/// calls `run`, possibly from a worker thread.
pub trait Agent: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    fn run(&self, query: &str) -> Result<AgentResponse, ChatError>;
}

impl<A: Agent + ?Sized> Agent for Box<A> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn run(&self, query: &str) -> Result<AgentResponse, ChatError> {
        (**self).run(query)
    }
}

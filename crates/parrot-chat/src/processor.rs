//! Message processing strategy.
//!
//! The interface talks to a `MessageProcessor`; the default one wraps an
//! `Agent`. Processing never fails outward: errors and panics come back as a
//! `Reply::Failure` carrying printable text.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use parrot_core::types::{SENDER_ASSISTANT, SENDER_ERROR};
use tracing::{debug, warn};

use crate::agent::Agent;

/// Prefix of every failure reply shown to the user.
pub const ERROR_PREFIX: &str = "Error processing query: ";

/// Outcome of processing one query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Answer(String),
    Failure { detail: String },
}

impl Reply {
    pub fn failure(detail: impl Into<String>) -> Self {
        Reply::Failure {
            detail: detail.into(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Reply::Failure { .. })
    }

    /// Text appended to the transcript.
    pub fn text(&self) -> String {
        match self {
            Reply::Answer(text) => text.clone(),
            Reply::Failure { detail } => format!("{}{}", ERROR_PREFIX, detail),
        }
    }

    /// Sender label the reply is recorded under.
    pub fn sender(&self) -> &'static str {
        match self {
            Reply::Answer(_) => SENDER_ASSISTANT,
            Reply::Failure { .. } => SENDER_ERROR,
        }
    }
}

impl From<Reply> for String {
    fn from(reply: Reply) -> Self {
        reply.text()
    }
}

/// Strategy for answering a user query.
pub trait MessageProcessor: Send + Sync {
    fn process(&self, query: &str) -> Reply;
}

/// Processor backed by an agent.
pub struct AgentMessageProcessor {
    agent: Box<dyn Agent>,
}

impl AgentMessageProcessor {
    pub fn new(agent: Box<dyn Agent>) -> Self {
        Self { agent }
    }

    pub fn agent_name(&self) -> &str {
        self.agent.name()
    }
}

impl MessageProcessor for AgentMessageProcessor {
    fn process(&self, query: &str) -> Reply {
        debug!(agent = self.agent.name(), query_len = query.len(), "Running agent");
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| self.agent.run(query))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let detail = panic_message(payload.as_ref());
                warn!(agent = self.agent.name(), panic = %detail, "Agent panicked");
                return Reply::failure(format!("agent panicked: {}", detail));
            }
        };

        match outcome {
            Ok(response) => {
                if let Some(error) = response.error {
                    warn!(agent = self.agent.name(), error = %error, "Agent reported failure");
                    return Reply::failure(error);
                }
                match response.content {
                    Some(content) => Reply::Answer(content),
                    None => Reply::Answer(response.to_string()),
                }
            }
            Err(e) => {
                warn!(agent = self.agent.name(), error = %e, "Agent run failed");
                Reply::failure(e.to_string())
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

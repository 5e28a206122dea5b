//! Chat session orchestration for Parrot.
//!
//! Wires a message processor (wrapping an agent), the append-only
//! conversation, persistence listeners, slash commands, and export into a
//! blocking read-eval-print loop.

pub mod agent;
pub mod commands;
pub mod error;
pub mod exporter;
pub mod help;
pub mod input;
pub mod interface;
pub mod listener;
pub mod processor;

pub use agent::{Agent, AgentResponse};
pub use commands::{Command, CommandRegistry, CommandResponse, CommandResult};
pub use error::ChatError;
pub use exporter::{ExportFormat, Exporter};
pub use input::{BufferedReader, LineReader, ReadOutcome, RustylineReader};
pub use interface::{ChatContext, ChatInterface, ChatState, SessionStart};
pub use listener::{ChatEventListener, DbSaveListener, TracingListener};
pub use processor::{AgentMessageProcessor, MessageProcessor, Reply};

//! Slash commands.
//!
//! Commands are matched by prefix in registration order: the first prefix
//! the trimmed input starts with wins, so `/q anything` still quits.

use std::sync::Arc;

use parrot_core::config::expand_home;
use tracing::{debug, info};

use crate::error::ChatError;
use crate::exporter::{ExportFormat, Exporter};
use crate::help::render_help;
use crate::interface::ChatInterface;

/// What the loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    /// Not a command; treat the input as a query.
    Continue,
    /// End the session.
    Stop,
    /// Handled; read the next line.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResponse {
    pub result: CommandResult,
    pub data: Option<String>,
}

impl CommandResponse {
    pub fn new(result: CommandResult) -> Self {
        Self { result, data: None }
    }

    pub fn with_data(result: CommandResult, data: impl Into<String>) -> Self {
        Self {
            result,
            data: Some(data.into()),
        }
    }

    pub fn proceed() -> Self {
        Self::new(CommandResult::Continue)
    }

    pub fn stop() -> Self {
        Self::new(CommandResult::Stop)
    }

    pub fn skip() -> Self {
        Self::new(CommandResult::Skip)
    }
}

pub trait Command {
    fn execute(&self, interface: &mut ChatInterface) -> Result<CommandResponse, ChatError>;

    /// One-line description for the help table.
    fn description(&self) -> &str;

    fn example(&self) -> &str;
}

/// Ordered prefix table of commands.
#[derive(Clone, Default)]
pub struct CommandRegistry {
    entries: Vec<(String, Arc<dyn Command>)>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `/q`, `/?` and `/export`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("/q", QuitCommand);
        registry.register("/?", HelpCommand);
        registry.register("/export", ExportCommand);
        registry
    }

    /// Append a command. Earlier registrations take precedence on overlap.
    pub fn register(&mut self, prefix: impl Into<String>, command: impl Command + 'static) {
        self.entries.push((prefix.into(), Arc::new(command)));
    }

    /// First command whose prefix `input` starts with.
    pub fn lookup(&self, input: &str) -> Option<(&str, Arc<dyn Command>)> {
        self.entries
            .iter()
            .find(|(prefix, _)| input.starts_with(prefix.as_str()))
            .map(|(prefix, command)| (prefix.as_str(), Arc::clone(command)))
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &dyn Command)> {
        self.entries
            .iter()
            .map(|(prefix, command)| (prefix.as_str(), command.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(prefix, _)| prefix))
            .finish()
    }
}

// =============================================================================
// Built-in commands
// =============================================================================

pub struct QuitCommand;

impl Command for QuitCommand {
    fn execute(&self, _interface: &mut ChatInterface) -> Result<CommandResponse, ChatError> {
        debug!("Quit requested");
        Ok(CommandResponse::stop())
    }

    fn description(&self) -> &str {
        "Quit the application"
    }

    fn example(&self) -> &str {
        "/q"
    }
}

pub struct HelpCommand;

impl Command for HelpCommand {
    fn execute(&self, interface: &mut ChatInterface) -> Result<CommandResponse, ChatError> {
        let help = render_help(interface.commands());
        interface.display(&help)?;
        Ok(CommandResponse::skip())
    }

    fn description(&self) -> &str {
        "Display this help message"
    }

    fn example(&self) -> &str {
        "/?"
    }
}

/// Prompts for a format and directory, then writes the transcript.
pub struct ExportCommand;

impl Command for ExportCommand {
    fn execute(&self, interface: &mut ChatInterface) -> Result<CommandResponse, ChatError> {
        let defaults = interface.export_config().clone();

        let Some(format) = interface.prompt("Export format (text/json/csv)", &defaults.default_format)?
        else {
            interface.display("Export cancelled.")?;
            return Ok(CommandResponse::skip());
        };
        let format: ExportFormat = format.parse()?;

        let Some(dir) = interface.prompt("Destination directory", &defaults.default_dir)? else {
            interface.display("Export cancelled.")?;
            return Ok(CommandResponse::skip());
        };
        let dir = expand_home(&dir);

        let path = Exporter::new(interface.conversation()).export(format, &dir)?;
        info!(session_id = %interface.session_id(), path = %path.display(), "Export command finished");

        interface.display(&format!("Export completed.\n{}", path.display()))?;
        Ok(CommandResponse::with_data(
            CommandResult::Skip,
            path.display().to_string(),
        ))
    }

    fn description(&self) -> &str {
        "Export the current chat history to a file"
    }

    fn example(&self) -> &str {
        "/export"
    }
}

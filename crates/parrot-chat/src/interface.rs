//! Chat interface: the read-eval-print loop.
//!
//! Owns the conversation and coordinates command dispatch, query processing,
//! listener notification and rendering. Everything runs on the caller's
//! thread except the processor, which runs on a worker thread when an
//! interrupt flag is installed so that Ctrl-C can abandon a slow query.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use parrot_core::config::ExportConfig;
use parrot_core::types::{Conversation, Message, SENDER_USER};
use parrot_storage::ChatRepository;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::commands::{CommandRegistry, CommandResponse, CommandResult};
use crate::error::ChatError;
use crate::input::{LineReader, ReadOutcome};
use crate::listener::{ChatEventListener, DbSaveListener};
use crate::processor::{MessageProcessor, Reply};

/// Prompt shown before each line of input.
pub const PROMPT: &str = ">>> ";
pub const INPUT_HINT: &str = "Ask your question (/? for help)";
pub const HEADER: &str = "Parrot 🦜: Talk to your data!";
pub const FAREWELL: &str = "Goodbye! 👋";
const SPINNER_MESSAGE: &str = "Processing...";
/// How often the interrupt flag is checked while a query runs.
const INTERRUPT_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatState {
    #[default]
    Idle,
    Processing,
    /// The last query failed. The next accepted query moves back to `Processing`.
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatContext {
    pub state: ChatState,
    pub last_error: Option<String>,
}

/// How to bind the interface to a stored session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStart {
    New { title: Option<String> },
    Resume(Uuid),
}

pub struct ChatInterface {
    session_id: Uuid,
    conversation: Conversation,
    context: ChatContext,
    processor: Arc<dyn MessageProcessor>,
    listeners: Vec<Box<dyn ChatEventListener>>,
    commands: CommandRegistry,
    reader: Box<dyn LineReader>,
    out: Box<dyn Write>,
    export: ExportConfig,
    interrupt: Option<Arc<AtomicBool>>,
    show_progress: bool,
    needs_render: bool,
}

impl ChatInterface {
    /// Interface over an in-memory session with no listeners.
    pub fn new(
        session_id: Uuid,
        processor: Box<dyn MessageProcessor>,
        reader: Box<dyn LineReader>,
        out: Box<dyn Write>,
    ) -> Self {
        Self {
            session_id,
            conversation: Conversation::new(),
            context: ChatContext::default(),
            processor: Arc::from(processor),
            listeners: Vec::new(),
            commands: CommandRegistry::with_defaults(),
            reader,
            out,
            export: ExportConfig::default(),
            interrupt: None,
            show_progress: true,
            needs_render: false,
        }
    }

    /// Interface bound to a persisted session.
    ///
    /// A resumed session's messages are loaded in sequence order without
    /// notifying listeners. A `DbSaveListener` is registered either way.
    pub fn open(
        repo: ChatRepository,
        start: SessionStart,
        processor: Box<dyn MessageProcessor>,
        reader: Box<dyn LineReader>,
        out: Box<dyn Write>,
    ) -> Result<Self, ChatError> {
        let (session_id, conversation) = match start {
            SessionStart::New { title } => {
                let session = repo.create_session(title.as_deref(), None)?;
                info!(session_id = %session.id, "Chat session started");
                (session.id, Conversation::new())
            }
            SessionStart::Resume(id) => {
                let (session, stored) = repo
                    .load_conversation(id)?
                    .ok_or(ChatError::SessionNotFound(id))?;
                let mut conversation = Conversation::new();
                for message in &stored {
                    conversation.append(Message::new(&message.sender, &message.raw_content));
                }
                info!(
                    session_id = %session.id,
                    messages = conversation.len(),
                    "Chat session resumed"
                );
                (session.id, conversation)
            }
        };

        let mut interface = Self::new(session_id, processor, reader, out);
        interface.needs_render = !conversation.is_empty();
        interface.conversation = conversation;
        interface.add_listener(Box::new(DbSaveListener::new(repo)));
        Ok(interface)
    }

    pub fn with_export_config(mut self, export: &ExportConfig) -> Self {
        self.export = export.clone();
        self
    }

    /// Flag checked before each read and while a query runs. Once it is set
    /// the pending reply is dropped and the loop ends.
    pub fn with_interrupt_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = Some(flag);
        self
    }

    /// Toggle the spinner shown while a query is processed.
    pub fn with_progress(mut self, enabled: bool) -> Self {
        self.show_progress = enabled;
        self
    }

    pub fn with_commands(mut self, commands: CommandRegistry) -> Self {
        self.commands = commands;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn context(&self) -> &ChatContext {
        &self.context
    }

    pub fn state(&self) -> ChatState {
        self.context.state
    }

    pub fn commands(&self) -> &CommandRegistry {
        &self.commands
    }

    pub fn export_config(&self) -> &ExportConfig {
        &self.export
    }

    /// Listener names in notification order.
    pub fn listener_names(&self) -> Vec<&str> {
        self.listeners.iter().map(|l| l.name()).collect()
    }

    // =========================================================================
    // Collaborators
    // =========================================================================

    pub fn set_message_processor(&mut self, processor: Box<dyn MessageProcessor>) {
        self.processor = Arc::from(processor);
    }

    pub fn add_listener(&mut self, listener: Box<dyn ChatEventListener>) {
        debug!(listener = listener.name(), "Listener registered");
        self.listeners.push(listener);
    }

    /// Remove the first listener with `name`. Returns whether one was removed.
    pub fn remove_listener(&mut self, name: &str) -> bool {
        match self.listeners.iter().position(|l| l.name() == name) {
            Some(index) => {
                self.listeners.remove(index);
                true
            }
            None => false,
        }
    }

    // =========================================================================
    // Conversation
    // =========================================================================

    /// Append a message and notify every listener in registration order.
    ///
    /// A failing listener is logged and skipped; the message stays in the
    /// conversation and later listeners still run.
    pub fn add_message(&mut self, content: &str, sender: &str) {
        self.conversation.append(Message::new(sender, content));
        self.needs_render = true;

        let Some(message) = self.conversation.last() else {
            return;
        };
        for listener in &self.listeners {
            if let Err(e) = listener.on_message_added(message, self.session_id) {
                warn!(
                    listener = listener.name(),
                    session_id = %self.session_id,
                    error = %e,
                    "Listener failed"
                );
            }
        }
    }

    /// Run the processor on `query` and append its reply.
    pub fn process_query(&mut self, query: &str) -> Reply {
        self.context.state = ChatState::Processing;
        let reply = self.processor.process(query);
        self.record_reply(reply)
    }

    fn record_reply(&mut self, reply: Reply) -> Reply {
        match &reply {
            Reply::Answer(_) => self.context.state = ChatState::Idle,
            Reply::Failure { detail } => {
                self.context.state = ChatState::Error;
                self.context.last_error = Some(detail.clone());
            }
        }
        self.add_message(&reply.text(), reply.sender());
        reply
    }

    /// Record a user query and answer it.
    ///
    /// Returns `ChatError::Interrupted` when the interrupt flag is raised
    /// while the query runs; the user message stays, the reply is dropped.
    pub fn submit(&mut self, query: &str) -> Result<Reply, ChatError> {
        if query.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        self.add_message(query, SENDER_USER);
        self.process_with_progress(query)
    }

    fn process_with_progress(&mut self, query: &str) -> Result<Reply, ChatError> {
        let spinner = self.show_progress.then(|| {
            let spinner = ProgressBar::new_spinner();
            if let Ok(style) =
                ProgressStyle::default_spinner().template("{spinner:.cyan} {msg:.white.italic}")
            {
                spinner.set_style(style);
            }
            spinner.set_message(SPINNER_MESSAGE);
            spinner.enable_steady_tick(Duration::from_millis(80));
            spinner
        });

        self.context.state = ChatState::Processing;
        let outcome = match self.interrupt.clone() {
            Some(flag) => self.process_interruptible(query, &flag),
            None => Some(self.processor.process(query)),
        };
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }

        match outcome {
            Some(reply) => Ok(self.record_reply(reply)),
            None => {
                self.context.state = ChatState::Idle;
                info!(session_id = %self.session_id, "Query interrupted");
                Err(ChatError::Interrupted)
            }
        }
    }

    /// Run the processor on a worker thread, polling `flag` until it answers.
    ///
    /// Returns `None` if the flag is set before or as the reply arrives. The
    /// worker is detached; a late reply is discarded.
    fn process_interruptible(&self, query: &str, flag: &AtomicBool) -> Option<Reply> {
        let processor = Arc::clone(&self.processor);
        let owned = query.to_string();
        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("parrot-query".to_string())
            .spawn(move || {
                let _ = tx.send(processor.process(&owned));
            });
        if let Err(e) = spawned {
            warn!(error = %e, "Cannot start query worker, processing inline");
            return Some(self.processor.process(query));
        }

        loop {
            if flag.load(Ordering::SeqCst) {
                return None;
            }
            match rx.recv_timeout(INTERRUPT_POLL) {
                Ok(reply) => return (!flag.load(Ordering::SeqCst)).then_some(reply),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => {
                    warn!(session_id = %self.session_id, "Query worker exited without a reply");
                    return Some(Reply::failure("message processor stopped unexpectedly"));
                }
            }
        }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Dispatch `input` if it starts with a registered prefix.
    ///
    /// A command error is shown to the user and reported as `Skip`.
    pub fn handle_command(&mut self, input: &str) -> CommandResponse {
        let Some((prefix, command)) = self
            .commands
            .lookup(input)
            .map(|(prefix, command)| (prefix.to_string(), command))
        else {
            return CommandResponse::proceed();
        };

        debug!(command = %prefix, "Dispatching command");
        match command.execute(self) {
            Ok(response) => response,
            Err(e) => {
                warn!(command = %prefix, error = %e, "Command failed");
                let notice = format!("{} failed: {}", prefix, e).red().to_string();
                if let Err(write_err) = self.display(&notice) {
                    warn!(error = %write_err, "Could not report command failure");
                }
                CommandResponse::skip()
            }
        }
    }

    /// Ask a follow-up question. Empty input selects `default`; `None` means
    /// the user cancelled.
    pub fn prompt(&mut self, question: &str, default: &str) -> Result<Option<String>, ChatError> {
        let label = format!("{} [{}]: ", question, default);
        match self.reader.read_line(&label)? {
            ReadOutcome::Line(answer) => {
                let answer = answer.trim();
                if answer.is_empty() {
                    Ok(Some(default.to_string()))
                } else {
                    Ok(Some(answer.to_string()))
                }
            }
            ReadOutcome::Interrupted | ReadOutcome::Eof => Ok(None),
        }
    }

    // =========================================================================
    // Output
    // =========================================================================

    /// Write a block of text outside the transcript.
    pub fn display(&mut self, text: &str) -> Result<(), ChatError> {
        writeln!(self.out, "{}", text)?;
        self.out.flush()?;
        Ok(())
    }

    /// Print the full transcript in order, with styling.
    pub fn render_chat_history(&mut self) -> Result<(), ChatError> {
        for message in &self.conversation {
            writeln!(self.out, "{}", message.rendered())?;
        }
        self.out.flush()?;
        self.needs_render = false;
        Ok(())
    }

    fn display_header(&mut self) -> Result<(), ChatError> {
        let header = format!("{}", HEADER.cyan().bold());
        self.display(&header)
    }

    fn display_farewell(&mut self) -> Result<(), ChatError> {
        let farewell = format!("{}", FAREWELL.red().bold());
        self.display(&farewell)
    }

    fn interrupted(&self) -> bool {
        self.interrupt
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    // =========================================================================
    // Loop
    // =========================================================================

    /// Run until `/q`, end of input, or an interrupt.
    ///
    /// Lines are dispatched and stored as typed; only blank lines are skipped.
    pub fn run(&mut self) -> Result<(), ChatError> {
        info!(session_id = %self.session_id, "Chat loop started");
        self.display_header()?;

        loop {
            if self.needs_render {
                self.render_chat_history()?;
            }
            if self.interrupted() {
                debug!("Interrupt flag set");
                break;
            }

            let hint = format!("{}", INPUT_HINT.truecolor(0x94, 0x94, 0x94).italic());
            self.display(&hint)?;

            let line = match self.reader.read_line(PROMPT) {
                Ok(ReadOutcome::Line(line)) => line,
                Ok(ReadOutcome::Interrupted) | Ok(ReadOutcome::Eof) => break,
                Err(e) => {
                    warn!(error = %e, "Input failed, ending session");
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }
            self.reader.add_history(&line);

            let response = self.handle_command(&line);
            match response.result {
                CommandResult::Stop => break,
                CommandResult::Skip => continue,
                CommandResult::Continue => match self.submit(&line) {
                    Ok(_) => {}
                    Err(ChatError::Interrupted) => break,
                    Err(e) => return Err(e),
                },
            }
        }

        self.display_farewell()?;
        info!(
            session_id = %self.session_id,
            messages = self.conversation.len(),
            "Chat loop finished"
        );
        Ok(())
    }
}

impl std::fmt::Debug for ChatInterface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatInterface")
            .field("session_id", &self.session_id)
            .field("messages", &self.conversation.len())
            .field("context", &self.context)
            .field("listeners", &self.listener_names())
            .finish()
    }
}

//! Line input sources for the chat loop.

use std::io::BufRead;

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::error::ChatError;

/// Result of asking for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A line without its trailing newline.
    Line(String),
    /// Ctrl-C at the prompt.
    Interrupted,
    /// Ctrl-D or end of stream.
    Eof,
}

/// Blocking source of user input.
pub trait LineReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome, ChatError>;

    /// Remember an accepted line. No-op by default.
    fn add_history(&mut self, _line: &str) {}
}

/// Interactive terminal input with per-run history.
pub struct RustylineReader {
    editor: DefaultEditor,
}

impl RustylineReader {
    pub fn new() -> Result<Self, ChatError> {
        let editor = DefaultEditor::new().map_err(|e| ChatError::Input(e.to_string()))?;
        Ok(Self { editor })
    }
}

impl LineReader for RustylineReader {
    fn read_line(&mut self, prompt: &str) -> Result<ReadOutcome, ChatError> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadOutcome::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(e) => Err(ChatError::Input(e.to_string())),
        }
    }

    fn add_history(&mut self, line: &str) {
        let _ = self.editor.add_history_entry(line);
    }
}

/// Reads lines from any buffered stream. Used for piped stdin and tests.
///
/// The prompt is not echoed.
pub struct BufferedReader<R> {
    inner: R,
}

impl<R: BufRead> BufferedReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: BufRead> LineReader for BufferedReader<R> {
    fn read_line(&mut self, _prompt: &str) -> Result<ReadOutcome, ChatError> {
        let mut line = String::new();
        if self.inner.read_line(&mut line)? == 0 {
            return Ok(ReadOutcome::Eof);
        }
        let trimmed = line.strip_suffix('\n').unwrap_or(&line);
        let trimmed = trimmed.strip_suffix('\r').unwrap_or(trimmed);
        Ok(ReadOutcome::Line(trimmed.to_string()))
    }
}

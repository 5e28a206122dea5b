//! Styled transcript text.
//!
//! A `StyledText` keeps the plain prefix/body alongside the color and
//! emphasis chosen for its sender, so the transcript can be re-rendered in
//! full (with styling) at any time and exported without escape codes.

use std::fmt;

use colored::{Color, Colorize};
use serde::{Deserialize, Serialize};

/// Text emphasis applied to the message body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emphasis {
    Plain,
    Bold,
    Italic,
}

/// Display style for one sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenderStyle {
    pub color: Color,
    pub emphasis: Emphasis,
    pub prefix: &'static str,
}

const YOU_STYLE: SenderStyle = SenderStyle {
    color: Color::Green,
    emphasis: Emphasis::Bold,
    prefix: "👤 > ",
};

const PARROT_STYLE: SenderStyle = SenderStyle {
    color: Color::Magenta,
    emphasis: Emphasis::Italic,
    prefix: "🦜 > ",
};

const ERROR_STYLE: SenderStyle = SenderStyle {
    color: Color::Red,
    emphasis: Emphasis::Bold,
    prefix: "❌ > ",
};

impl SenderStyle {
    /// Style for a sender label. Unknown senders get the assistant style.
    pub fn for_sender(sender: &str) -> Self {
        match sender {
            crate::types::SENDER_USER => YOU_STYLE,
            crate::types::SENDER_ERROR => ERROR_STYLE,
            _ => PARROT_STYLE,
        }
    }
}

/// Rendered form of a chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledText {
    prefix: String,
    body: String,
    color: Color,
    emphasis: Emphasis,
}

impl StyledText {
    pub fn new(prefix: impl Into<String>, body: impl Into<String>, style: SenderStyle) -> Self {
        Self {
            prefix: prefix.into(),
            body: body.into(),
            color: style.color,
            emphasis: style.emphasis,
        }
    }

    /// Render `body` with the style table entry for `sender`.
    pub fn for_sender(sender: &str, body: &str) -> Self {
        let style = SenderStyle::for_sender(sender);
        Self::new(style.prefix, body, style)
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn emphasis(&self) -> Emphasis {
        self.emphasis
    }

    /// Prefix and body without any escape codes.
    pub fn plain(&self) -> String {
        format!("{}{}", self.prefix, self.body)
    }
}

impl fmt::Display for StyledText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = self.body.color(self.color);
        let body = match self.emphasis {
            Emphasis::Plain => body,
            Emphasis::Bold => body.bold(),
            Emphasis::Italic => body.italic(),
        };
        write!(f, "{}{}", self.prefix.color(self.color), body)
    }
}

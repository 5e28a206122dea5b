//! Conversation export to text, JSON and CSV files.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Local;
use parrot_core::types::{Conversation, MessageRecord};
use serde::Serialize;
use tracing::info;

use crate::error::ChatError;

/// File name prefix of every export.
pub const EXPORT_FILE_PREFIX: &str = "Parrot_Export_";

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    Text,
    Json,
    Csv,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [Self::Text, Self::Json, Self::Csv];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(ChatError::UnsupportedExportFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize)]
struct JsonExport<'a> {
    messages: Vec<MessageRecord<'a>>,
    total_messages: usize,
}

/// Writes one conversation to disk.
///
/// The timestamp in the file name is fixed when the exporter is created.
pub struct Exporter<'a> {
    conversation: &'a Conversation,
    file_stem: String,
}

impl<'a> Exporter<'a> {
    pub fn new(conversation: &'a Conversation) -> Self {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        Self::with_timestamp(conversation, &timestamp)
    }

    pub fn with_timestamp(conversation: &'a Conversation, timestamp: &str) -> Self {
        Self {
            conversation,
            file_stem: format!("{}{}", EXPORT_FILE_PREFIX, timestamp),
        }
    }

    pub fn file_name(&self, format: ExportFormat) -> String {
        format!("{}.{}", self.file_stem, format.extension())
    }

    /// Serialize the conversation without touching the filesystem.
    pub fn render(&self, format: ExportFormat) -> Result<String, ChatError> {
        match format {
            ExportFormat::Text => Ok(self.to_text()),
            ExportFormat::Json => self.to_json(),
            ExportFormat::Csv => Ok(self.to_csv()),
        }
    }

    /// Write the export into `dir`, creating it if needed. Returns the file path.
    pub fn export(&self, format: ExportFormat, dir: &Path) -> Result<PathBuf, ChatError> {
        std::fs::create_dir_all(dir).map_err(|e| {
            ChatError::Export(format!("cannot create directory {}: {}", dir.display(), e))
        })?;

        let body = self.render(format)?;
        let path = dir.join(self.file_name(format));
        std::fs::write(&path, body)
            .map_err(|e| ChatError::Export(format!("cannot write {}: {}", path.display(), e)))?;

        info!(
            path = %path.display(),
            format = %format,
            messages = self.conversation.len(),
            "Conversation exported"
        );
        Ok(path)
    }

    fn to_text(&self) -> String {
        let mut out = String::new();
        for message in self.conversation {
            out.push_str(&message.to_string());
            out.push('\n');
        }
        out
    }

    fn to_json(&self) -> Result<String, ChatError> {
        let export = JsonExport {
            messages: self.conversation.iter().map(|m| m.to_record()).collect(),
            total_messages: self.conversation.len(),
        };
        serde_json::to_string(&export).map_err(|e| ChatError::Export(e.to_string()))
    }

    fn to_csv(&self) -> String {
        let mut out = String::from("Sender,Content\r\n");
        for message in self.conversation {
            out.push_str(&csv_field(message.sender()));
            out.push(',');
            out.push_str(&csv_field(message.raw_content()));
            out.push_str("\r\n");
        }
        out
    }
}

/// Quote a CSV field when it contains a delimiter, quote or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parrot_core::types::Message;

    fn revenue_conversation() -> Conversation {
        let mut conv = Conversation::new();
        conv.append(Message::new("You", "What is total revenue?"));
        conv.append(Message::new("Parrot", "$42,000"));
        conv
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("text".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert_eq!("TXT".parse::<ExportFormat>().unwrap(), ExportFormat::Text);
        assert_eq!(" Json ".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!(matches!(
            "xml".parse::<ExportFormat>(),
            Err(ChatError::UnsupportedExportFormat(ref s)) if s == "xml"
        ));
    }

    #[test]
    fn test_json_scenario() {
        let conv = revenue_conversation();
        let json = Exporter::new(&conv).render(ExportFormat::Json).unwrap();
        assert!(json.contains(
            r#"{"messages":[{"sender":"You","content":"What is total revenue?"},{"sender":"Parrot","content":"$42,000"}],"total_messages":2}"#
        ));
    }

    #[test]
    fn test_text_format() {
        let conv = revenue_conversation();
        let text = Exporter::new(&conv).render(ExportFormat::Text).unwrap();
        assert_eq!(text, "You: What is total revenue?\nParrot: $42,000\n");
    }

    #[test]
    fn test_csv_format_quotes_special_fields() {
        let conv = revenue_conversation();
        let csv = Exporter::new(&conv).render(ExportFormat::Csv).unwrap();
        assert_eq!(
            csv,
            "Sender,Content\r\nYou,What is total revenue?\r\nParrot,\"$42,000\"\r\n"
        );
    }

    #[test]
    fn test_csv_field_escaping() {
        assert_eq!(csv_field("plain"), "plain");
        assert_eq!(csv_field("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(csv_field("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn test_empty_conversation_exports() {
        let conv = Conversation::new();
        let exporter = Exporter::new(&conv);
        assert_eq!(exporter.render(ExportFormat::Text).unwrap(), "");
        assert_eq!(
            exporter.render(ExportFormat::Json).unwrap(),
            r#"{"messages":[],"total_messages":0}"#
        );
        assert_eq!(exporter.render(ExportFormat::Csv).unwrap(), "Sender,Content\r\n");
    }

    #[test]
    fn test_file_name_uses_timestamp() {
        let conv = Conversation::new();
        let exporter = Exporter::with_timestamp(&conv, "20240102_030405");
        assert_eq!(
            exporter.file_name(ExportFormat::Csv),
            "Parrot_Export_20240102_030405.csv"
        );
        assert_eq!(
            exporter.file_name(ExportFormat::Text),
            "Parrot_Export_20240102_030405.txt"
        );
    }

    #[test]
    fn test_export_creates_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a").join("b").join("c");
        let conv = revenue_conversation();

        let path = Exporter::new(&conv)
            .export(ExportFormat::Json, &target)
            .unwrap();

        assert!(path.starts_with(&target));
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("Parrot_Export_"));
        assert!(name.ends_with(".json"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains(r#""total_messages":2"#));
    }

    #[test]
    fn test_export_same_content_to_different_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let conv = revenue_conversation();

        for format in ExportFormat::ALL {
            let first = Exporter::new(&conv)
                .export(format, &dir.path().join("one"))
                .unwrap();
            let second = Exporter::new(&conv)
                .export(format, &dir.path().join("two"))
                .unwrap();
            assert_eq!(
                std::fs::read_to_string(first).unwrap(),
                std::fs::read_to_string(second).unwrap()
            );
        }
    }

    #[test]
    fn test_export_into_file_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();
        let conv = revenue_conversation();

        let err = Exporter::new(&conv)
            .export(ExportFormat::Text, &blocker.join("sub"))
            .unwrap_err();
        assert!(matches!(err, ChatError::Export(_)));
    }
}

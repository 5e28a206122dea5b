//! CLI argument definitions for the Parrot binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use parrot_core::DataSourceKind;
use uuid::Uuid;

pub const CONFIG_ENV: &str = "PARROT_CONFIG";
pub const DATA_DIR_ENV: &str = "PARROT_DATA_DIR";

/// Parrot: talk to your data from the terminal.
#[derive(Parser, Debug)]
#[command(name = "parrot", version, about, args_conflicts_with_subcommands = true)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Data directory holding the chat database.
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// Prompt for model settings and save them before starting.
    #[arg(long = "configure", global = true)]
    pub configure: bool,

    #[command(flatten)]
    pub chat: ChatArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an interactive chat (the default).
    Chat(ChatArgs),
    /// Inspect and manage stored chat sessions.
    #[command(subcommand)]
    Sessions(SessionCommand),
}

/// Options for an interactive chat. Missing source details are prompted for.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Data source type: sql, csv or parquet.
    #[arg(short = 's', long = "source", value_parser = parse_source_kind)]
    pub source: Option<DataSourceKind>,

    /// File path for csv and parquet sources.
    #[arg(short = 'p', long = "path")]
    pub path: Option<PathBuf>,

    #[arg(long = "db-host")]
    pub db_host: Option<String>,

    #[arg(long = "db-port")]
    pub db_port: Option<u16>,

    #[arg(long = "db-user")]
    pub db_user: Option<String>,

    #[arg(long = "db-password")]
    pub db_password: Option<String>,

    #[arg(long = "db-name")]
    pub db_name: Option<String>,

    /// Continue an existing session instead of starting a new one.
    #[arg(short = 'r', long = "resume")]
    pub resume: Option<Uuid>,

    /// Title for a new session.
    #[arg(short = 't', long = "title", conflicts_with = "resume")]
    pub title: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// List sessions, most recently active first.
    List {
        #[arg(long, default_value_t = 20)]
        limit: u64,
        #[arg(long, default_value_t = 0)]
        offset: u64,
    },
    /// Print a session's transcript.
    Show { id: Uuid },
    /// Delete a session and its messages.
    Delete { id: Uuid },
    /// Change a session's title.
    Rename { id: Uuid, title: String },
}

fn parse_source_kind(value: &str) -> Result<DataSourceKind, String> {
    value.parse().map_err(|e: parrot_core::ParrotError| e.to_string())
}

impl CliArgs {
    /// Chat options, whether given at the top level or after `chat`.
    pub fn chat_args(&self) -> &ChatArgs {
        match &self.command {
            Some(Command::Chat(args)) => args,
            _ => &self.chat,
        }
    }

    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > PARROT_CONFIG env var > ~/.parrot/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the data directory override.
    ///
    /// Priority: --data-dir flag > PARROT_DATA_DIR env var.
    /// Returns `None` if neither is set (use config value).
    pub fn resolve_data_dir(&self) -> Option<String> {
        if let Some(ref p) = self.data_dir {
            return Some(p.to_string_lossy().to_string());
        }
        std::env::var(DATA_DIR_ENV).ok().filter(|v| !v.is_empty())
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    parrot_core::config::expand_home("~/.parrot/config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_bare_invocation_is_chat() {
        let args = parse(&["parrot"]);
        assert!(args.command.is_none());
        assert_eq!(args.chat_args(), &ChatArgs::default());
        assert!(!args.configure);
    }

    #[test]
    fn test_top_level_chat_options() {
        let args = parse(&["parrot", "--source", "CSV", "--path", "sales.csv", "--title", "Q3"]);
        let chat = args.chat_args();
        assert_eq!(chat.source, Some(DataSourceKind::Csv));
        assert_eq!(chat.path, Some(PathBuf::from("sales.csv")));
        assert_eq!(chat.title.as_deref(), Some("Q3"));
    }

    #[test]
    fn test_chat_subcommand_options() {
        let args = parse(&[
            "parrot",
            "chat",
            "--source",
            "sql",
            "--db-host",
            "db.internal",
            "--db-port",
            "6543",
            "--db-user",
            "analyst",
            "--db-name",
            "warehouse",
        ]);
        let chat = args.chat_args();
        assert_eq!(chat.source, Some(DataSourceKind::Sql));
        assert_eq!(chat.db_host.as_deref(), Some("db.internal"));
        assert_eq!(chat.db_port, Some(6543));
        assert_eq!(chat.db_user.as_deref(), Some("analyst"));
        assert_eq!(chat.db_name.as_deref(), Some("warehouse"));
        assert!(chat.db_password.is_none());
    }

    #[test]
    fn test_unknown_source_rejected() {
        let err = CliArgs::try_parse_from(["parrot", "--source", "excel"]).unwrap_err();
        assert!(err.to_string().contains("Unsupported data source type: excel"));
    }

    #[test]
    fn test_resume_and_title_conflict() {
        let id = Uuid::new_v4().to_string();
        assert!(
            CliArgs::try_parse_from(["parrot", "--resume", id.as_str(), "--title", "x"]).is_err()
        );
        let args = parse(&["parrot", "--resume", id.as_str()]);
        assert_eq!(args.chat_args().resume.map(|u| u.to_string()), Some(id));
    }

    #[test]
    fn test_sessions_subcommands() {
        let args = parse(&["parrot", "sessions", "list", "--limit", "5"]);
        assert_eq!(
            args.command.map(|c| match c {
                Command::Sessions(s) => s,
                Command::Chat(_) => panic!("expected sessions"),
            }),
            Some(SessionCommand::List { limit: 5, offset: 0 })
        );

        let id = Uuid::new_v4();
        let raw = id.to_string();
        let args = parse(&["parrot", "sessions", "rename", raw.as_str(), "New title"]);
        assert!(matches!(
            args.command,
            Some(Command::Sessions(SessionCommand::Rename { id: got, ref title }))
                if got == id && title == "New title"
        ));
    }

    #[test]
    fn test_sessions_rejects_bad_uuid() {
        assert!(CliArgs::try_parse_from(["parrot", "sessions", "show", "not-a-uuid"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["parrot", "sessions", "list", "--log-level", "debug"]);
        assert_eq!(args.resolve_log_level("warn"), "debug");
    }

    #[test]
    fn test_flag_overrides() {
        let args = parse(&["parrot", "-c", "/tmp/p.toml", "-d", "/tmp/parrot-data"]);
        assert_eq!(args.resolve_config_path(), PathBuf::from("/tmp/p.toml"));
        assert_eq!(args.resolve_data_dir().as_deref(), Some("/tmp/parrot-data"));
    }

    #[test]
    fn test_log_level_falls_back_to_config() {
        let args = parse(&["parrot"]);
        assert_eq!(args.resolve_log_level("warn"), "warn");
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        CliArgs::command().debug_assert();
    }
}

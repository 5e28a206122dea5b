//! Parrot application binary - composition root.
//!
//! 1. Parse CLI args and load configuration from TOML
//! 2. Open the SQLite chat store
//! 3. Either run a `sessions` admin command, or
//! 4. Resolve the data source, build the agent and run the chat loop

mod agents;
mod cli;
mod provider;
mod sessions;
mod setup;

use std::io::IsTerminal;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use parrot_chat::{
    AgentMessageProcessor, BufferedReader, ChatInterface, LineReader, RustylineReader,
    SessionStart, TracingListener,
};
use parrot_core::ParrotConfig;
use parrot_storage::{ChatRepository, Database};

use crate::agents::AgentFactory;
use crate::cli::{CliArgs, Command};
use crate::setup::Prompter;

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Config.
    let config_file = args.resolve_config_path();
    let first_run = !config_file.exists();
    let mut config = ParrotConfig::load_or_default(&config_file);
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }

    init_tracing(&args.resolve_log_level(&config.general.log_level));
    tracing::info!("Starting Parrot v{}", env!("CARGO_PKG_VERSION"));

    let interactive = std::io::stdin().is_terminal();
    let wants_chat = !matches!(args.command, Some(Command::Sessions(_)));
    if args.configure || (first_run && interactive && wants_chat) {
        configure(&mut config, &config_file)?;
    }

    // Storage.
    let data_dir = config.resolve_data_dir();
    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("cannot create data directory {}", data_dir.display()))?;
    let db_path = config.database_path();
    let db = Database::new(&db_path)
        .with_context(|| format!("cannot open database {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), "SQLite database opened");
    let repo = ChatRepository::new(Arc::new(db));

    match &args.command {
        Some(Command::Sessions(command)) => {
            sessions::run(&repo, command, &mut std::io::stdout().lock())
        }
        Some(Command::Chat(_)) | None => run_chat(&args, &config, repo, interactive),
    }
}

/// Prompt for model settings and persist them.
fn configure(config: &mut ParrotConfig, path: &Path) -> Result<()> {
    let mut prompter = Prompter::new(std::io::stdin().lock(), std::io::stdout());
    config.model = setup::prompt_model_config(&mut prompter, &config.model)?;
    config
        .save(path)
        .with_context(|| format!("cannot save configuration to {}", path.display()))?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}

fn run_chat(
    args: &CliArgs,
    config: &ParrotConfig,
    repo: ChatRepository,
    interactive: bool,
) -> Result<()> {
    let chat_args = args.chat_args();

    let source = {
        let mut prompter = Prompter::new(std::io::stdin().lock(), std::io::stdout());
        setup::resolve_data_source(&mut prompter, chat_args)?
    };
    let agent = AgentFactory::create(&config.model, source).context("cannot create agent")?;
    let processor = Box::new(AgentMessageProcessor::new(agent));

    let start = match chat_args.resume {
        Some(id) => SessionStart::Resume(id),
        None => SessionStart::New {
            title: chat_args.title.clone(),
        },
    };

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .context("cannot install Ctrl-C handler")?;

    let reader: Box<dyn LineReader> = if interactive {
        Box::new(RustylineReader::new()?)
    } else {
        Box::new(BufferedReader::new(std::io::stdin().lock()))
    };

    let mut interface = ChatInterface::open(repo, start, processor, reader, Box::new(std::io::stdout()))?
        .with_export_config(&config.export)
        .with_interrupt_flag(interrupted)
        .with_progress(interactive);
    interface.add_listener(Box::new(TracingListener));
    interface.run()?;

    tracing::info!(session_id = %interface.session_id(), "Session closed");
    Ok(())
}

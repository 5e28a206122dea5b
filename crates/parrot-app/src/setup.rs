//! Interactive prompts for missing startup details.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use parrot_core::config::ModelConfig;
use parrot_core::{DataSource, DataSourceKind};

use crate::cli::ChatArgs;
use crate::provider::Provider;

/// Line-oriented question/answer over any reader and writer.
pub struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Ask once. Blank input selects `default` when there is one.
    pub fn ask(&mut self, label: &str, default: Option<&str>) -> Result<String> {
        match default {
            Some(d) if !d.is_empty() => write!(self.output, "{} [{}]: ", label.blue(), d)?,
            _ => write!(self.output, "{}: ", label.blue())?,
        }
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            bail!("input closed while asking for {}", label);
        }
        let answer = line.trim();
        Ok(match default {
            Some(d) if answer.is_empty() => d.to_string(),
            _ => answer.to_string(),
        })
    }

    /// Ask until a non-empty answer is given.
    pub fn ask_required(&mut self, label: &str) -> Result<String> {
        loop {
            let answer = self.ask(label, None)?;
            if !answer.is_empty() {
                return Ok(answer);
            }
            writeln!(self.output, "{}", "A value is required.".red())?;
        }
    }
}

/// Build the data source from CLI options, prompting for anything missing.
pub fn resolve_data_source<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    args: &ChatArgs,
) -> Result<DataSource> {
    let kind = match args.source {
        Some(kind) => kind,
        None => prompter
            .ask("Select data source type (sql/csv/parquet)", Some("sql"))?
            .parse::<DataSourceKind>()?,
    };

    let source = match kind {
        DataSourceKind::Sql => DataSource::Sql {
            user: answer_or_ask(prompter, &args.db_user, "Database user", Some("postgres"))?,
            password: answer_or_ask(prompter, &args.db_password, "Database password", Some(""))?,
            host: answer_or_ask(prompter, &args.db_host, "Database host", Some("localhost"))?,
            port: match args.db_port {
                Some(port) => port,
                None => {
                    let raw = prompter.ask("Database port", Some("5432"))?;
                    raw.parse()
                        .with_context(|| format!("invalid database port: {}", raw))?
                }
            },
            database: answer_or_ask(prompter, &args.db_name, "Database name", Some("postgres"))?,
        },
        DataSourceKind::Csv => DataSource::Csv {
            path: path_or_ask(prompter, &args.path, "Enter the path to the CSV file")?,
        },
        DataSourceKind::Parquet => DataSource::Parquet {
            path: path_or_ask(prompter, &args.path, "Enter the path to the Parquet file")?,
        },
    };
    Ok(source)
}

/// Prompt for model settings, offering the current values as defaults.
pub fn prompt_model_config<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    current: &ModelConfig,
) -> Result<ModelConfig> {
    writeln!(prompter.output, "{}", "Interactive Model Configuration".blue().bold())?;

    let provider: Provider = prompter
        .ask("Provider (groq/ollama/openai)", Some(&current.provider))?
        .parse()?;
    let model = prompter.ask("Model name", Some(&current.model))?;

    let key_hint = if current.api_key.is_some() {
        "API key (blank keeps the saved key)"
    } else {
        "API key (blank for none)"
    };
    let api_key = match prompter.ask(key_hint, None)? {
        key if key.is_empty() => current.api_key.clone(),
        key => Some(key),
    };

    let endpoint_default = current
        .endpoint
        .clone()
        .unwrap_or_else(|| provider.default_endpoint().to_string());
    let endpoint = prompter.ask("Endpoint", Some(&endpoint_default))?;
    let endpoint = (endpoint != provider.default_endpoint()).then_some(endpoint);

    Ok(ModelConfig {
        provider: provider.as_str().to_string(),
        model,
        api_key,
        endpoint,
        ..current.clone()
    })
}

fn answer_or_ask<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    given: &Option<String>,
    label: &str,
    default: Option<&str>,
) -> Result<String> {
    match given {
        Some(value) => Ok(value.clone()),
        None => prompter.ask(label, default),
    }
}

fn path_or_ask<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    given: &Option<PathBuf>,
    label: &str,
) -> Result<PathBuf> {
    match given {
        Some(path) => Ok(path.clone()),
        None => Ok(PathBuf::from(prompter.ask_required(label)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn prompter(script: &str) -> Prompter<Cursor<String>, Vec<u8>> {
        colored::control::set_override(false);
        Prompter::new(Cursor::new(script.to_string()), Vec::new())
    }

    #[test]
    fn test_ask_default_and_answer() {
        let mut p = prompter("\n  custom  \n");
        assert_eq!(p.ask("Host", Some("localhost")).unwrap(), "localhost");
        assert_eq!(p.ask("Host", Some("localhost")).unwrap(), "custom");
        assert!(p.ask("Host", Some("localhost")).is_err());
        let shown = String::from_utf8(p.output).unwrap();
        assert!(shown.contains("Host [localhost]: "));
    }

    #[test]
    fn test_ask_required_repeats() {
        let mut p = prompter("\n\nsales.csv\n");
        assert_eq!(p.ask_required("Path").unwrap(), "sales.csv");
        let shown = String::from_utf8(p.output).unwrap();
        assert_eq!(shown.matches("A value is required.").count(), 2);
    }

    #[test]
    fn test_csv_source_from_flags_needs_no_input() {
        let args = ChatArgs {
            source: Some(DataSourceKind::Csv),
            path: Some(PathBuf::from("data/sales.csv")),
            ..Default::default()
        };
        let source = resolve_data_source(&mut prompter(""), &args).unwrap();
        assert_eq!(
            source,
            DataSource::Csv {
                path: PathBuf::from("data/sales.csv")
            }
        );
    }

    #[test]
    fn test_sql_source_prompts_for_missing_fields() {
        let args = ChatArgs {
            db_host: Some("db.internal".to_string()),
            ..Default::default()
        };
        // kind, user, password, port, database
        let source =
            resolve_data_source(&mut prompter("\nanalyst\nhunter2\n6543\nnetflix\n"), &args).unwrap();
        assert_eq!(
            source,
            DataSource::Sql {
                user: "analyst".to_string(),
                password: "hunter2".to_string(),
                host: "db.internal".to_string(),
                port: 6543,
                database: "netflix".to_string(),
            }
        );
    }

    #[test]
    fn test_sql_source_defaults() {
        let source = resolve_data_source(&mut prompter("sql\n\n\n\n\n\n"), &ChatArgs::default()).unwrap();
        assert_eq!(
            source.connection_string().as_deref(),
            Some("postgresql://postgres:@localhost:5432/postgres")
        );
    }

    #[test]
    fn test_invalid_port_is_an_error() {
        let args = ChatArgs {
            source: Some(DataSourceKind::Sql),
            ..Default::default()
        };
        let err = resolve_data_source(&mut prompter("\n\n\nfive\n"), &args).unwrap_err();
        assert!(err.to_string().contains("invalid database port: five"));
    }

    #[test]
    fn test_unsupported_kind_typed_at_prompt() {
        let err = resolve_data_source(&mut prompter("excel\n"), &ChatArgs::default()).unwrap_err();
        assert!(err.to_string().contains("Unsupported data source type: excel"));
    }

    #[test]
    fn test_parquet_prompts_for_path() {
        let source =
            resolve_data_source(&mut prompter("parquet\nevents.parquet\n"), &ChatArgs::default())
                .unwrap();
        assert_eq!(
            source,
            DataSource::Parquet {
                path: PathBuf::from("events.parquet")
            }
        );
    }

    #[test]
    fn test_model_config_prompt_keeps_defaults() {
        let mut current = ModelConfig::default();
        current.api_key = Some("saved".to_string());
        let updated = prompt_model_config(&mut prompter("\n\n\n\n"), &current).unwrap();
        assert_eq!(updated, current);
    }

    #[test]
    fn test_model_config_prompt_switches_provider() {
        let updated = prompt_model_config(
            &mut prompter("ollama\nllama3\n\nhttp://gpu-box:11434/v1\n"),
            &ModelConfig::default(),
        )
        .unwrap();
        assert_eq!(updated.provider, "ollama");
        assert_eq!(updated.model, "llama3");
        assert!(updated.api_key.is_none());
        assert_eq!(updated.endpoint.as_deref(), Some("http://gpu-box:11434/v1"));
        assert_eq!(updated.request_timeout_secs, 120);
    }

    #[test]
    fn test_model_config_prompt_rejects_unknown_provider() {
        let err = prompt_model_config(&mut prompter("acme\n"), &ModelConfig::default()).unwrap_err();
        assert!(err.to_string().contains("Unsupported model provider: acme"));
    }
}

//! LLM-backed agents and the factory that builds one per data source.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use parrot_chat::{Agent, AgentResponse, ChatError};
use parrot_core::config::ModelConfig;
use parrot_core::{DataSource, ParrotError};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::provider::ProviderSettings;

/// Rows of a CSV file shown to the model after the header.
const CSV_PREVIEW_ROWS: usize = 5;

const ANALYST_INSTRUCTIONS: &str = "\
Answer the user's question about this data as a careful data analyst.
- Interpret the intent of the question and work out the query needed to answer it.
- Only read data. Never modify, drop or delete anything.
- Select only the columns you need and validate names against the schema above.
- If the question is ambiguous or the data cannot answer it, ask for clarification or say you don't know.
- Reply with the answer as a single line, without the query you used.";

// =============================================================================
// Wire format (OpenAI chat completions)
// =============================================================================

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [WireMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

// =============================================================================
// LlmAgent
// =============================================================================

/// Single-turn agent: system prompt describing the source, then the query.
pub struct LlmAgent {
    client: Client,
    settings: ProviderSettings,
    system_prompt: String,
    label: String,
}

impl LlmAgent {
    pub fn new(settings: ProviderSettings, system_prompt: String) -> Result<Self, ParrotError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| ParrotError::Config(format!("cannot build HTTP client: {}", e)))?;
        let label = format!("{}/{}", settings.provider, settings.model);
        Ok(Self {
            client,
            settings,
            system_prompt,
            label,
        })
    }
}

impl Agent for LlmAgent {
    fn name(&self) -> &str {
        &self.label
    }

    fn run(&self, query: &str) -> Result<AgentResponse, ChatError> {
        let body = CompletionRequest {
            model: &self.settings.model,
            messages: [
                WireMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                WireMessage {
                    role: "user",
                    content: query,
                },
            ],
            temperature: self.settings.temperature,
        };

        let mut request = self.client.post(self.settings.completions_url()).json(&body);
        if let Some(ref key) = self.settings.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .map_err(|e| ChatError::Agent(format!("request failed: {}", e)))?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .map_err(|e| ChatError::Agent(format!("cannot read response: {}", e)))?;
        debug!(agent = %self.label, status, bytes = text.len(), "Completion received");

        parse_completion(query, status, &text)
    }
}

/// Turn a chat-completions HTTP response into an `AgentResponse`.
///
/// Non-2xx statuses are reported failures; an unparseable 2xx body is an error.
fn parse_completion(query: &str, status: u16, body: &str) -> Result<AgentResponse, ChatError> {
    if !(200..300).contains(&status) {
        let detail = serde_json::from_str::<ErrorEnvelope>(body)
            .map(|envelope| envelope.error.message)
            .unwrap_or_else(|_| body.trim().to_string());
        return Ok(AgentResponse::failed(
            query,
            format!("provider returned HTTP {}: {}", status, detail),
        ));
    }

    let parsed: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| ChatError::Agent(format!("malformed completion response: {}", e)))?;
    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .filter(|content| !content.is_empty());

    Ok(AgentResponse {
        content,
        error: None,
        raw_input: query.to_string(),
    })
}

// =============================================================================
// Factory
// =============================================================================

pub struct AgentFactory;

impl AgentFactory {
    /// Build the agent for `source` using the configured provider.
    pub fn create(model: &ModelConfig, source: DataSource) -> Result<Box<dyn Agent>, ParrotError> {
        let settings = ProviderSettings::from_config(model)?;
        Self::create_with(settings, source)
    }

    pub fn create_with(
        settings: ProviderSettings,
        source: DataSource,
    ) -> Result<Box<dyn Agent>, ParrotError> {
        let prompt = system_prompt(&source)?;
        info!(
            provider = %settings.provider,
            model = %settings.model,
            source = %source,
            "Agent created"
        );
        Ok(Box::new(LlmAgent::new(settings, prompt)?))
    }
}

/// Describe the data source for the model.
pub fn system_prompt(source: &DataSource) -> Result<String, ParrotError> {
    let description = match source {
        DataSource::Sql {
            host,
            port,
            database,
            user,
            ..
        } => format!(
            "You are an expert SQL analyst working against the PostgreSQL database \
             '{}' on {}:{} as user '{}'.",
            database, host, port, user
        ),
        DataSource::Csv { path } => format!(
            "You are a data analyst working with the CSV file '{}'.\n\
             Here are its columns with the first {} records for reference:\n{}",
            path.display(),
            CSV_PREVIEW_ROWS,
            csv_preview(path, CSV_PREVIEW_ROWS)?
        ),
        DataSource::Parquet { path } => {
            std::fs::metadata(path)?;
            format!(
                "You are a DuckDB analyst working with the Parquet file '{}'. \
                 Query it directly, e.g. SELECT ... FROM '{}'.",
                path.display(),
                path.display()
            )
        }
    };
    Ok(format!("{}\n\n{}", description, ANALYST_INSTRUCTIONS))
}

/// Header plus the first `rows` lines of a CSV file.
fn csv_preview(path: &Path, rows: usize) -> Result<String, ParrotError> {
    let reader = BufReader::new(File::open(path)?);
    let mut preview = String::new();
    for line in reader.lines().take(rows + 1) {
        preview.push_str(&line?);
        preview.push('\n');
    }
    if preview.is_empty() {
        return Err(ParrotError::UnsupportedDataSource(format!(
            "CSV file {} is empty",
            path.display()
        )));
    }
    Ok(preview)
}

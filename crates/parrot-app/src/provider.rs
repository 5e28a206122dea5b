//! Model provider selection.
//!
//! Every supported provider speaks the OpenAI chat-completions protocol, so a
//! provider is just a default base URL plus whether it needs a key.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use parrot_core::config::ModelConfig;
use parrot_core::ParrotError;

pub const API_KEY_ENV: &str = "PARROT_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Groq,
    Ollama,
    OpenAi,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Groq => "groq",
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
        }
    }

    pub fn default_endpoint(self) -> &'static str {
        match self {
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::Ollama => "http://localhost:11434/v1",
            Self::OpenAi => "https://api.openai.com/v1",
        }
    }

    pub fn requires_api_key(self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

impl FromStr for Provider {
    type Err = ParrotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "groq" => Ok(Self::Groq),
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            other => Err(ParrotError::UnsupportedProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to call a provider.
#[derive(Clone, PartialEq)]
pub struct ProviderSettings {
    pub provider: Provider,
    pub model: String,
    /// Base URL without a trailing slash.
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub temperature: f32,
}

impl ProviderSettings {
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }

    /// Resolve settings from config, reading the key override from the environment.
    pub fn from_config(config: &ModelConfig) -> Result<Self, ParrotError> {
        let env_key = std::env::var(API_KEY_ENV).ok();
        Self::resolve(config, env_key)
    }

    /// Resolve settings. A non-empty `env_api_key` beats `config.api_key`.
    pub fn resolve(config: &ModelConfig, env_api_key: Option<String>) -> Result<Self, ParrotError> {
        let provider: Provider = config.provider.parse()?;

        let api_key = env_api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| config.api_key.clone().filter(|k| !k.trim().is_empty()));
        if provider.requires_api_key() && api_key.is_none() {
            return Err(ParrotError::NotInitialized(format!(
                "API key for provider '{}' (set model.api_key or {})",
                provider, API_KEY_ENV
            )));
        }

        let endpoint = config
            .endpoint
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .unwrap_or(provider.default_endpoint())
            .trim_end_matches('/')
            .to_string();

        if config.model.trim().is_empty() {
            return Err(ParrotError::Config("model name must not be empty".to_string()));
        }

        Ok(Self {
            provider,
            model: config.model.clone(),
            endpoint,
            api_key,
            timeout: Duration::from_secs(config.request_timeout_secs),
            temperature: config.temperature,
        })
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "****"))
            .field("timeout", &self.timeout)
            .field("temperature", &self.temperature)
            .finish()
    }
}

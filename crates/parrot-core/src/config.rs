use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

/// Top-level configuration for Parrot.
///
/// Loaded from `~/.parrot/config.toml` by default. Every section falls back
/// to its defaults when absent, so a partial file is valid.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParrotConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

impl ParrotConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ParrotConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    ///
    /// The file may hold `model.api_key`, so on Unix it is only readable by
    /// its owner.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        write_private(path, content.as_bytes())?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Data directory with `~` expanded.
    pub fn resolve_data_dir(&self) -> PathBuf {
        expand_home(&self.general.data_dir)
    }

    /// Full path of the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        self.resolve_data_dir().join(&self.storage.database_file)
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the database and saved settings.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.parrot".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// LLM provider settings used to build the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Provider name: "groq", "ollama" or "openai".
    pub provider: String,
    /// Model identifier passed to the provider.
    pub model: String,
    /// API key; may also come from `PARROT_API_KEY`.
    pub api_key: Option<String>,
    /// Overrides the provider's default chat-completions base URL.
    pub endpoint: Option<String>,
    pub request_timeout_secs: u64,
    pub temperature: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            api_key: None,
            endpoint: None,
            request_timeout_secs: 120,
            temperature: 0.0,
        }
    }
}

/// SQLite storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file name, relative to `general.data_dir`.
    pub database_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_file: "parrot.db".to_string(),
        }
    }
}

/// Defaults offered by the `/export` command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// "text", "json" or "csv".
    pub default_format: String,
    pub default_dir: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            default_format: "text".to_string(),
            default_dir: ".".to_string(),
        }
    }
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("."));
    }
    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        return home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(rest);
    }
    PathBuf::from(path)
}

#[cfg(unix)]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    // `mode` only applies on creation.
    file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
    file.write_all(content)
}

#[cfg(not(unix))]
fn write_private(path: &Path, content: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, content)
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    let home = std::env::var("USERPROFILE").ok();
    #[cfg(not(target_os = "windows"))]
    let home = std::env::var("HOME").ok();
    home.map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ParrotConfig::default();
        assert_eq!(config.general.data_dir, "~/.parrot");
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.model.provider, "groq");
        assert_eq!(config.model.request_timeout_secs, 120);
        assert!(config.model.api_key.is_none());
        assert_eq!(config.storage.database_file, "parrot.db");
        assert_eq!(config.export.default_format, "text");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
            [model]
            provider = "ollama"
            model = "llama3.2"
        "#;
        let config: ParrotConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.model.provider, "ollama");
        assert_eq!(config.model.model, "llama3.2");
        assert_eq!(config.model.request_timeout_secs, 120);
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.export.default_dir, ".");
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: ParrotConfig = toml::from_str("").unwrap();
        assert_eq!(config.model, ModelConfig::default());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = ParrotConfig::default();
        config.model.provider = "openai".to_string();
        config.model.api_key = Some("sk-test".to_string());
        config.export.default_format = "csv".to_string();
        config.save(&path).unwrap();

        let loaded = ParrotConfig::load(&path).unwrap();
        assert_eq!(loaded.model.provider, "openai");
        assert_eq!(loaded.model.api_key.as_deref(), Some("sk-test"));
        assert_eq!(loaded.export.default_format, "csv");
    }

    #[cfg(unix)]
    #[test]
    fn test_saved_config_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        let mut config = ParrotConfig::default();
        config.model.api_key = Some("gsk-secret".to_string());
        config.save(&path).unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
        assert_eq!(
            ParrotConfig::load(&path).unwrap().model.api_key.as_deref(),
            Some("gsk-secret")
        );
    }

    #[test]
    fn test_load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let result = ParrotConfig::load(&dir.path().join("absent.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_or_default_on_bad_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = [[[").unwrap();
        let config = ParrotConfig::load_or_default(&path);
        assert_eq!(config.model.provider, "groq");
    }

    #[test]
    fn test_expand_home_plain_path() {
        assert_eq!(expand_home("/var/lib/parrot"), PathBuf::from("/var/lib/parrot"));
        assert_eq!(expand_home("relative/dir"), PathBuf::from("relative/dir"));
    }

    #[test]
    fn test_expand_home_tilde() {
        let expanded = expand_home("~/.parrot");
        assert!(expanded.ends_with(".parrot"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }

    #[test]
    fn test_database_path_joins_data_dir() {
        let mut config = ParrotConfig::default();
        config.general.data_dir = "/tmp/parrot-data".to_string();
        assert_eq!(
            config.database_path(),
            PathBuf::from("/tmp/parrot-data/parrot.db")
        );
    }
}

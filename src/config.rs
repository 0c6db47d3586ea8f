use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable consulted when the config file has no API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// API key for the provider, takes precedence over the environment
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API, including the version segment
    pub base_url: String,

    /// Settings for general and persona chat
    #[serde(deserialize_with = "chat_table")]
    pub chat: ChatSettings,

    /// Settings for document-grounded chat
    #[serde(deserialize_with = "documents_table")]
    pub documents: ChatSettings,

    /// Content-addressed cache of extracted PDF text
    pub cache_dir: PathBuf,

    /// Where generated images and exported reports are written.
    /// Unset means the working directory of each run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
}

/// Model and sampling parameters for one kind of conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ChatSettings {
    pub fn chat_defaults() -> Self {
        Self {
            model: "gpt-3.5-turbo".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
        }
    }

    pub fn document_defaults() -> Self {
        Self {
            model: "gpt-4".to_string(),
            temperature: 0.3,
            max_tokens: 1000,
        }
    }
}

/// A `[chat]` or `[documents]` table where every key may be omitted
#[derive(Debug, Default, Deserialize)]
struct PartialChatSettings {
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl PartialChatSettings {
    fn over(self, base: ChatSettings) -> ChatSettings {
        ChatSettings {
            model: self.model.unwrap_or(base.model),
            temperature: self.temperature.unwrap_or(base.temperature),
            max_tokens: self.max_tokens.unwrap_or(base.max_tokens),
        }
    }
}

fn chat_table<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<ChatSettings, D::Error> {
    PartialChatSettings::deserialize(deserializer).map(|p| p.over(ChatSettings::chat_defaults()))
}

fn documents_table<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<ChatSettings, D::Error> {
    PartialChatSettings::deserialize(deserializer).map(|p| p.over(ChatSettings::document_defaults()))
}

impl Default for Config {
    fn default() -> Self {
        let home = llmdesk_home();

        Config {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            chat: ChatSettings::chat_defaults(),
            documents: ChatSettings::document_defaults(),
            cache_dir: home.join("pdf_cache"),
            output_dir: None,
        }
    }
}

fn llmdesk_home() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".llmdesk")
}

impl Config {
    /// Load configuration from `~/.llmdesk/config.toml`, falling back to defaults
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        let llmdesk_home = home.join(".llmdesk");

        fs::create_dir_all(&llmdesk_home)
            .context("Failed to create .llmdesk directory")?;

        Self::load_from(&llmdesk_home.join("config.toml"))
    }

    /// Load configuration from an explicit path
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path)
            .context("Failed to read config file")?;
        toml::from_str(&content).context("Failed to parse config file")
    }

    /// Save configuration to `~/.llmdesk/config.toml`
    pub fn save(&self) -> Result<()> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        self.save_to(&home.join(".llmdesk").join("config.toml"))
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(config_path, content)
            .context("Failed to write config file")?;
        Ok(())
    }

    /// Check if API key is configured
    pub fn has_api_key(&self) -> bool {
        self.get_api_key().is_some()
    }

    /// Get API key from config or environment
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
    }

    /// Update API key
    pub fn set_api_key(&mut self, key: String) {
        self.api_key = Some(key);
    }

    /// Configured output directory, or the current working directory
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config.chat, ChatSettings::chat_defaults());
        assert_eq!(config.documents.model, "gpt-4");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn save_then_load_keeps_settings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set_api_key("sk-test".to_string());
        config.chat.model = "gpt-4o-mini".to_string();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_key.as_deref(), Some("sk-test"));
        assert_eq!(loaded.chat.model, "gpt-4o-mini");
        assert_eq!(loaded.get_api_key().as_deref(), Some("sk-test"));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "base_url = \"http://localhost:8080/v1\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.documents, ChatSettings::document_defaults());
    }

    #[test]
    fn partial_chat_tables_keep_their_own_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[chat]\nmodel = \"gpt-4o\"\n\n[documents]\nmax_tokens = 2000\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.chat.model, "gpt-4o");
        assert_eq!(config.chat.temperature, 0.7);
        assert_eq!(config.chat.max_tokens, 1000);
        assert_eq!(config.documents.model, "gpt-4");
        assert_eq!(config.documents.temperature, 0.3);
        assert_eq!(config.documents.max_tokens, 2000);
    }

    #[test]
    fn saving_does_not_pin_the_working_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.set_api_key("sk-test".to_string());
        config.save_to(&path).unwrap();

        assert!(!fs::read_to_string(&path).unwrap().contains("output_dir"));
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.output_dir, None);
        assert_eq!(loaded.output_dir(), std::env::current_dir().unwrap());
    }

    #[test]
    fn explicit_output_dir_is_kept() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.output_dir = Some(dir.path().join("renders"));
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.output_dir(), dir.path().join("renders"));
    }
}

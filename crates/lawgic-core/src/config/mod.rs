use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{chat, env, models};
use crate::context::StoreOptions;
use crate::llm::{ModelTool, SessionConfig};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub chat: ChatSettings,
    #[serde(default)]
    pub storage: StorageSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub model: String,
    pub api_key_env: String,
    pub base_url: Option<String>,
    /// Abort a turn whose reply grows past this many characters.
    pub max_response_chars: Option<usize>,
    /// Let the model ground answers with web search.
    pub web_search: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    pub system_instruction: String,
    pub greeting: String,
    pub suggestions: Vec<String>,
    pub history_key: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// Persist history to files in this directory instead of process memory.
    pub session_dir: Option<PathBuf>,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: models::DEFAULT_GEMINI_MODEL.to_string(),
            api_key_env: env::DEFAULT_API_KEY_ENV.to_string(),
            base_url: None,
            max_response_chars: None,
            web_search: true,
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            system_instruction: chat::SYSTEM_INSTRUCTION.to_string(),
            greeting: chat::GREETING_TEXT.to_string(),
            suggestions: Vec::new(),
            history_key: chat::HISTORY_KEY.to_string(),
        }
    }
}

impl Settings {
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lawgic")
            .join("config.toml")
    }

    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Read settings from `path`, falling back to defaults when the file is
    /// missing or unreadable.
    pub fn load_from(path: &std::path::Path) -> Self {
        if path.exists() {
            match std::fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!("Ignoring invalid config {}: {e}", path.display()),
                },
                Err(e) => tracing::warn!("Failed to read config {}: {e}", path.display()),
            }
        }
        Self::default()
    }

    pub fn save(&self) -> Result<(), crate::error::LawgicError> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), crate::error::LawgicError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::LawgicError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the API key from the environment variable named in settings.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.llm.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Resolve the API key, failing with a configuration error when absent.
    pub fn require_api_key(&self) -> Result<String, crate::error::LawgicError> {
        self.api_key().ok_or_else(|| {
            crate::error::LawgicError::Config(format!(
                "{} environment variable not set. Please configure it to use the chatbot.",
                self.llm.api_key_env
            ))
        })
    }

    pub fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::new(&self.llm.model)
            .with_system_instruction(&self.chat.system_instruction);
        if self.llm.web_search {
            config = config.with_tool(ModelTool::GoogleSearch);
        }
        config
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            key: self.chat.history_key.clone(),
            greeting: self.chat.greeting.clone(),
        }
    }

    /// Build the Gemini backend from an explicitly resolved key.
    pub fn build_backend(
        &self,
        api_key: String,
    ) -> Result<crate::llm::GeminiClient, crate::error::LawgicError> {
        let client = crate::llm::GeminiClient::new(api_key)?;
        Ok(match self.llm.base_url {
            Some(ref url) => client.with_base_url(url),
            None => client,
        })
    }

    /// Build the persistence backend named by the storage settings.
    pub fn build_storage(
        &self,
    ) -> Result<Box<dyn crate::context::KeyValueStore>, crate::error::LawgicError> {
        Ok(match self.storage.session_dir {
            Some(ref dir) => Box::new(crate::context::FileStore::with_dir(dir.clone())?),
            None => Box::new(crate::context::MemoryStore::new()),
        })
    }
}

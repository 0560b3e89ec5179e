//! Persisted settings for the mobile agent CLI.
//! Stored as JSON in the platform-specific config directory via `directories::ProjectDirs`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::agent::{AgentConfig, DEFAULT_MAX_STEPS, DEFAULT_SETTLE_DELAY_MS};
use crate::model::{ModelConfig, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_SECS};

/// Application settings that can be saved and loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Model API base URL
    pub base_url: String,
    /// Model API key
    pub api_key: String,
    /// Model name
    pub model_name: String,
    /// ADB device ID (optional)
    pub device_id: String,
    /// Maximum retries for model requests
    pub max_retries: u32,
    /// Retry delay in seconds
    pub retry_delay: u64,
    /// Maximum steps for agent
    pub max_steps: u32,
    /// Run the note-taker after successful actions
    pub use_notetaker: bool,
    /// Pause after each action before the result is captured
    pub settle_delay_ms: u64,
}

impl Default for AppSettings {
    fn default() -> Self {
        let model = ModelConfig::default();
        Self {
            base_url: model.base_url,
            api_key: model.api_key,
            model_name: model.model_name,
            device_id: String::new(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY_SECS,
            max_steps: DEFAULT_MAX_STEPS,
            use_notetaker: false,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
        }
    }
}

impl AppSettings {
    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "moderras", "mobile-agent")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the settings file path.
    pub fn settings_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join("settings.json"))
    }

    /// Load settings from the config file, falling back to defaults.
    pub fn load() -> Self {
        Self::settings_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Load settings from `path`. Missing or unreadable files give defaults.
    pub fn load_from(path: &Path) -> Self {
        let mut loaded: Self = fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default();

        // Backfill fields an older file may have left blank
        let defaults = Self::default();
        if loaded.base_url.is_empty() {
            loaded.base_url = defaults.base_url;
        }
        if loaded.model_name.is_empty() {
            loaded.model_name = defaults.model_name;
        }
        if loaded.max_steps == 0 {
            loaded.max_steps = defaults.max_steps;
        }

        loaded
    }

    /// Save settings to the config file.
    pub fn save(&self) -> Result<(), String> {
        let path = Self::settings_path().ok_or("Cannot determine config directory")?;
        self.save_to(&path)
    }

    /// Save settings to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize settings: {}", e))?;

        fs::write(path, content).map_err(|e| format!("Failed to write settings file: {}", e))?;

        Ok(())
    }

    pub fn device_id(&self) -> Option<String> {
        let id = self.device_id.trim();
        (!id.is_empty()).then(|| id.to_string())
    }

    pub fn to_model_config(&self) -> ModelConfig {
        ModelConfig::default()
            .with_base_url(&self.base_url)
            .with_api_key(&self.api_key)
            .with_model_name(&self.model_name)
            .with_max_retries(self.max_retries)
            .with_retry_delay(self.retry_delay)
    }

    pub fn to_agent_config(&self) -> AgentConfig {
        AgentConfig::default()
            .with_max_steps(self.max_steps)
            .with_notetaker(self.use_notetaker)
            .with_settle_delay_ms(self.settle_delay_ms)
    }
}

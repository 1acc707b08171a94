use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable that overrides the backend endpoint
pub const ENDPOINT_ENV: &str = "GEMCHAT_ENDPOINT";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Base URL of the chat backend
    pub endpoint: String,

    /// Path of the chat route on the backend
    pub chat_path: String,

    /// Request timeout for the chat call
    pub request_timeout_secs: u64,

    /// Typing animation pacing
    pub typing: TypingConfig,

    /// UI preferences
    pub ui: UiConfig,
}

/// Per-character delay range of the typing animation, in milliseconds.
/// The delay is drawn uniformly from `[min_delay_ms, max_delay_ms)`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TypingConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UiConfig {
    /// The composer grows with its content up to this many lines
    pub max_composer_lines: u16,
    /// Oldest turns are dropped from the view past this count
    pub history_limit: usize,
    /// Redraw interval
    pub tick_rate_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            endpoint: "http://127.0.0.1:5000".to_string(),
            chat_path: "/chat".to_string(),
            request_timeout_secs: 120,
            typing: TypingConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 5,
            max_delay_ms: 25,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            max_composer_lines: 6,
            history_limit: 500,
            tick_rate_ms: 50,
        }
    }
}

impl Config {
    /// Home directory for config and logs (`~/.gemchat`)
    pub fn home_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not find home directory")?;
        Ok(home.join(".gemchat"))
    }

    /// Load `~/.gemchat/config.toml` (or `path` when given) and apply the
    /// endpoint environment override
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::home_dir()?.join("config.toml"),
        };

        let mut config = Self::load_from(&config_path)?;

        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV) {
            config.apply_endpoint(endpoint);
        }

        Ok(config)
    }

    /// Read a config file, using defaults when it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.typing.min_delay_ms > self.typing.max_delay_ms {
            anyhow::bail!(
                "typing.min_delay_ms ({}) is greater than typing.max_delay_ms ({})",
                self.typing.min_delay_ms,
                self.typing.max_delay_ms
            );
        }
        if self.endpoint.trim().is_empty() {
            anyhow::bail!("endpoint must not be empty");
        }
        Ok(())
    }

    /// Override the endpoint, ignoring blank values
    pub fn apply_endpoint(&mut self, endpoint: impl Into<String>) {
        let endpoint = endpoint.into();
        if !endpoint.trim().is_empty() {
            self.endpoint = endpoint.trim().to_string();
        }
    }

    /// Full URL of the chat route
    pub fn chat_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        let path = self.chat_path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.ui.tick_rate_ms.max(1))
    }
}

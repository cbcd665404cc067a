use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Base URL used when nothing else is configured.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Agent backend base URL
    pub endpoint: String,

    /// Outer HTTP request timeout in seconds
    pub request_timeout_secs: u64,

    /// Snoochat home directory; derived at load time, never configured
    #[serde(skip)]
    pub snoochat_home: PathBuf,

    /// UI preferences
    pub ui: UiConfig,
}

/// UI configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Show the agent's plan/tool trace as its own message
    pub show_steps: bool,

    /// Strip control characters out of rendered text
    pub sanitize_replies: bool,

    /// Input poll and animation tick in milliseconds
    pub tick_rate_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        UiConfig {
            show_steps: true,
            sanitize_replies: true,
            tick_rate_ms: 250,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));

        Config {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            request_timeout_secs: 120,
            snoochat_home: home.join(".snoochat"),
            ui: UiConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from `~/.snoochat/config.toml`. The directory
    /// and a starter config file are created on first run. Missing keys
    /// default field-wise. `SNOOCHAT_ENDPOINT` overrides the file.
    pub fn load() -> Result<Self> {
        let home = dirs::home_dir().context("could not find home directory")?;
        let snoochat_home = home.join(".snoochat");
        let config_path = snoochat_home.join("config.toml");

        fs::create_dir_all(&snoochat_home)
            .context("failed to create .snoochat directory")?;

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .context("failed to read config file")?;
            toml::from_str(&content)
                .context("failed to parse config file")?
        } else {
            let config = Config::default();
            config.save()?;
            config
        };

        config.snoochat_home = snoochat_home;

        if let Ok(endpoint) = std::env::var("SNOOCHAT_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                config.endpoint = endpoint;
            }
        }

        Ok(config)
    }

    /// Write the configuration out pretty-printed.
    pub fn save(&self) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("failed to serialize config")?;
        fs::write(self.config_path(), content)
            .context("failed to write config file")?;
        Ok(())
    }

    pub fn config_path(&self) -> PathBuf {
        self.snoochat_home.join("config.toml")
    }

    pub fn log_path(&self) -> PathBuf {
        self.snoochat_home.join("snoochat.log")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.ui.tick_rate_ms)
    }
}

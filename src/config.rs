// src/config.rs
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::countries::DEFAULT_COUNTRIES_URL;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cli_program: String,
    pub status_timeout_ms: u64,
    pub action_timeout_ms: u64,
    pub toggle_timeout_ms: u64,
    pub poll_interval_secs: u64,
    pub no_network_interval_secs: u64,
    pub countries_url: String,
    pub fetch_countries: bool,
    pub last_country: Option<String>,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cli_program: "nordvpn".to_string(),
            status_timeout_ms: 2000,
            action_timeout_ms: 3000,
            toggle_timeout_ms: 2000,
            poll_interval_secs: 10,
            no_network_interval_secs: 60,
            countries_url: DEFAULT_COUNTRIES_URL.to_string(),
            fetch_countries: true,
            last_country: None,
            log_level: "info".to_string(),
        }
    }
}

/// How the reconciler and dispatcher drive the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliSettings {
    pub program: String,
    /// Per sub-query deadline for `status` and `settings`.
    pub status_timeout: Duration,
    /// Deadline for connect and disconnect.
    pub action_timeout: Duration,
    /// Deadline for the `set` toggles.
    pub toggle_timeout: Duration,
    pub poll_interval: Duration,
    pub no_network_interval: Duration,
}

impl Default for CliSettings {
    fn default() -> Self {
        AppConfig::default().cli_settings()
    }
}

impl AppConfig {
    pub fn cli_settings(&self) -> CliSettings {
        CliSettings {
            program: self.cli_program.clone(),
            status_timeout: Duration::from_millis(self.status_timeout_ms),
            action_timeout: Duration::from_millis(self.action_timeout_ms),
            toggle_timeout: Duration::from_millis(self.toggle_timeout_ms),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            no_network_interval: Duration::from_secs(self.no_network_interval_secs),
        }
    }

    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find config directory"))?
            .join("nordtray")
            .join("config.json"))
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

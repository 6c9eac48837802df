//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the fact-check backend
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// User access token for authenticated calls
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Server API key for machine-mode calls (takes effect without a token)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Wallet id used for credits and rewards
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_id: Option<String>,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Default output format
    #[serde(default = "default_format")]
    pub format: OutputFormat,
}

/// Output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format
    Table,
    /// JSON format
    Json,
    /// Quiet (minimal) format
    Quiet,
}

impl Config {
    /// Get the configuration file path.
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".verity").join("config.toml"))
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default path or create a default.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;
        fs::write(&path, contents)?;
        Ok(())
    }

    /// The credential to use for backend calls.
    pub fn credential(&self) -> verity_provider::Credential {
        if let Some(token) = &self.access_token {
            verity_provider::Credential::Bearer(token.clone())
        } else if let Some(key) = &self.api_key {
            verity_provider::Credential::ApiKey(key.clone())
        } else {
            verity_provider::Credential::Anonymous
        }
    }

    /// The wallet id, required for credits and rewards.
    pub fn require_wallet(&self) -> Result<&str> {
        self.wallet_id
            .as_deref()
            .ok_or_else(|| CliError::Config("No wallet_id configured".into()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            access_token: None,
            api_key: None,
            wallet_id: None,
            settings: Settings::default(),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            format: OutputFormat::Table,
        }
    }
}

fn default_backend_url() -> String {
    verity_provider::http::DEFAULT_BASE_URL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_format() -> OutputFormat {
    OutputFormat::Table
}

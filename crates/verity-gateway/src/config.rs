//! Configuration file and environment parsing for the Gateway.
//!
//! Loads settings from TOML files or environment variables: bind address,
//! OIDC client credentials, callback/frontend URLs, the session secret, and
//! the server-held fact-check API key.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Gateway configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Missing required field
    #[error("Missing required configuration field: {0}")]
    MissingField(String),
}

/// Gateway configuration loaded from TOML or the environment
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Bind address (e.g., "127.0.0.1")
    pub bind_address: String,

    /// Bind port (e.g., 3000)
    pub bind_port: u16,

    /// OIDC issuer base URL
    #[serde(default = "default_issuer_url")]
    pub issuer_url: String,

    /// OIDC client id issued by the identity provider
    pub client_id: String,

    /// OIDC client secret
    pub client_secret: String,

    /// Redirect URI registered for the authorization-code flow
    pub callback_url: String,

    /// Where to send the browser after a successful login
    #[serde(default = "default_frontend_url")]
    pub frontend_url: String,

    /// Secret used to sign session cookies
    pub auth_secret: String,

    /// Base URL of the external fact-check backend
    pub api_base_url: String,

    /// Server-held API key for the proxy route; proxying fails without it
    #[serde(default)]
    pub fact_check_api_key: Option<String>,

    /// Server-side session lifetime in seconds (default: 3600 = 1 hour)
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,
}

fn default_issuer_url() -> String {
    "https://id.worldcoin.org".to_string()
}

fn default_frontend_url() -> String {
    "/".to_string()
}

/// Default session lifetime: 1 hour
fn default_session_ttl() -> u64 {
    3600
}

impl GatewayConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: GatewayConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Required: `WLD_CLIENT_ID`, `WLD_CLIENT_SECRET`, `AUTH_CALLBACK_URL`,
    /// `AUTH_SECRET`, `VERITY_API_BASE_URL`. Optional: `FRONTEND_URL`,
    /// `FACT_CHECK_API_KEY`, `VERITY_BIND_ADDRESS`, `VERITY_BIND_PORT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        fn required(name: &str) -> Result<String, ConfigError> {
            std::env::var(name).map_err(|_| ConfigError::MissingField(name.to_string()))
        }

        let config = GatewayConfig {
            bind_address: std::env::var("VERITY_BIND_ADDRESS")
                .unwrap_or_else(|_| "127.0.0.1".to_string()),
            bind_port: std::env::var("VERITY_BIND_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            issuer_url: std::env::var("WLD_ISSUER_URL").unwrap_or_else(|_| default_issuer_url()),
            client_id: required("WLD_CLIENT_ID")?,
            client_secret: required("WLD_CLIENT_SECRET")?,
            callback_url: required("AUTH_CALLBACK_URL")?,
            frontend_url: std::env::var("FRONTEND_URL").unwrap_or_else(|_| default_frontend_url()),
            auth_secret: required("AUTH_SECRET")?,
            api_base_url: required("VERITY_API_BASE_URL")?,
            fact_check_api_key: std::env::var("FACT_CHECK_API_KEY").ok(),
            session_ttl_secs: default_session_ttl(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate required fields
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id.is_empty() {
            return Err(ConfigError::MissingField("client_id".to_string()));
        }
        if self.client_secret.is_empty() {
            return Err(ConfigError::MissingField("client_secret".to_string()));
        }
        if self.auth_secret.is_empty() {
            return Err(ConfigError::MissingField("auth_secret".to_string()));
        }
        if self.callback_url.is_empty() {
            return Err(ConfigError::MissingField("callback_url".to_string()));
        }
        Ok(())
    }

    /// Create a default configuration for testing
    pub fn default_test_config() -> Self {
        GatewayConfig {
            bind_address: "127.0.0.1".to_string(),
            bind_port: 3000,
            issuer_url: default_issuer_url(),
            client_id: "app_test_client".to_string(),
            client_secret: "test-secret-do-not-use-in-production".to_string(),
            callback_url: "http://localhost:3000/auth/callback".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            auth_secret: "test-session-secret".to_string(),
            api_base_url: "http://localhost:8000".to_string(),
            fact_check_api_key: None,
            session_ttl_secs: 3600,
        }
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_test_config() {
        let config = GatewayConfig::default_test_config();
        assert!(config.validate().is_ok());
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert_eq!(config.session_ttl_secs, 3600);
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            bind_address = "0.0.0.0"
            bind_port = 8080
            client_id = "app_abc"
            client_secret = "shh"
            callback_url = "https://example.test/auth/callback"
            frontend_url = "https://example.test"
            auth_secret = "cookie-secret"
            api_base_url = "https://backend.example.test"
            fact_check_api_key = "server-key"
        "#;

        let config: GatewayConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.bind_port, 8080);
        assert_eq!(config.issuer_url, "https://id.worldcoin.org");
        assert_eq!(config.fact_check_api_key.as_deref(), Some("server-key"));
    }

    #[test]
    fn test_validate_rejects_empty_secret() {
        let mut config = GatewayConfig::default_test_config();
        config.client_secret = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingField(_))
        ));
    }
}

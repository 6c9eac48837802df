//! Configuration for the dispatcher

use serde::{Deserialize, Serialize};

/// Configuration for the fan-out dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Claims verified concurrently per batch
    pub batch_size: usize,

    /// Provider-side timeout passed with each verification call (seconds)
    pub check_timeout_secs: u64,

    /// Capacity of the best-effort side-task queue
    pub side_task_capacity: usize,
}

impl PipelineConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("batch_size must be greater than 0".to_string());
        }
        if self.check_timeout_secs == 0 {
            return Err("check_timeout_secs must be greater than 0".to_string());
        }
        if self.side_task_capacity == 0 {
            return Err("side_task_capacity must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to a TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: 3,
            check_timeout_secs: 60,
            side_task_capacity: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_size, 3);
    }

    #[test]
    fn test_zero_batch_size_invalid() {
        let config = PipelineConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = PipelineConfig::default();
        let toml_str = config.to_toml().unwrap();
        let parsed = PipelineConfig::from_toml(&toml_str).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn test_partial_toml_rejected() {
        // All fields are required; a bare table should not parse
        assert!(PipelineConfig::from_toml("batch_size = 3").is_err());
    }
}

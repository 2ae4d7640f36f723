//! Engine configuration
//!
//! ```toml
//! policy_memory_quota = 1048576
//! lock_poll_interval_ms = 10
//!
//! [[number_groups]]
//! name = "admins"
//! members = ["0", "500-599"]
//! ```

use crate::error::{ConditionError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Number group defined in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumberGroupConfig {
    pub name: String,
    /// `N` or `N-M` literals
    #[serde(default)]
    pub members: Vec<String>,
}

/// Condition engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Byte quota for interned conditions (0 = unlimited)
    pub policy_memory_quota: usize,

    /// Wait between interrupt checks while acquiring the policy lock
    pub lock_poll_interval_ms: u64,

    /// Number groups to create at startup
    pub number_groups: Vec<NumberGroupConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            policy_memory_quota: 0,
            lock_poll_interval_ms: 10,
            number_groups: Vec::new(),
        }
    }
}

impl EngineConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| ConditionError::Config(e.to_string()))
    }

    pub fn lock_poll_interval(&self) -> Duration {
        Duration::from_millis(self.lock_poll_interval_ms)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.lock_poll_interval_ms == 0 {
            return Err(ConditionError::Config(
                "lock_poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        for (i, group) in self.number_groups.iter().enumerate() {
            if group.name.is_empty() {
                return Err(ConditionError::Config(format!(
                    "number group {} has no name",
                    i
                )));
            }
        }

        Ok(())
    }
}

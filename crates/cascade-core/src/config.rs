//! Rollout configuration
//!
//! Loaded from TOML or built in code with the `with_*` methods.

use crate::error::RolloutError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the convergence engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RolloutConfig {
    /// Maximum repositories loaded concurrently during a fan-out
    pub max_concurrent_loads: usize,
    /// Proposal time-to-live in seconds; `None` keeps proposals forever
    pub proposal_ttl_secs: Option<u64>,
    /// Maximum retained proposals, only used with a TTL
    pub proposal_capacity: u64,
    /// Prefix of per-feature transform command names
    pub transform_command_prefix: String,
    /// Prefix of per-feature rollout command names
    pub rollout_command_prefix: String,
}

impl RolloutConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With fan-out concurrency bound
    #[inline]
    #[must_use]
    pub fn with_max_concurrent_loads(mut self, max: usize) -> Self {
        self.max_concurrent_loads = max;
        self
    }

    /// With proposal time-to-live
    #[inline]
    #[must_use]
    pub fn with_proposal_ttl(mut self, ttl: Duration) -> Self {
        self.proposal_ttl_secs = Some(ttl.as_secs());
        self
    }

    /// Proposal time-to-live, if any
    #[inline]
    #[must_use]
    pub fn proposal_ttl(&self) -> Option<Duration> {
        self.proposal_ttl_secs.map(Duration::from_secs)
    }

    /// Check invariants
    ///
    /// # Errors
    /// [`RolloutError::Config`] describing the first violated invariant
    pub fn validate(&self) -> Result<(), RolloutError> {
        if self.max_concurrent_loads == 0 {
            return Err(RolloutError::Config(
                "max_concurrent_loads must be at least 1".to_string(),
            ));
        }
        if self.proposal_ttl_secs == Some(0) {
            return Err(RolloutError::Config(
                "proposal_ttl_secs must be positive when set".to_string(),
            ));
        }
        if self.proposal_ttl_secs.is_some() && self.proposal_capacity == 0 {
            return Err(RolloutError::Config(
                "proposal_capacity must be positive when a TTL is set".to_string(),
            ));
        }
        for prefix in [&self.transform_command_prefix, &self.rollout_command_prefix] {
            if prefix.trim().is_empty() {
                return Err(RolloutError::Config("command prefixes must not be empty".to_string()));
            }
        }
        if self.transform_command_prefix == self.rollout_command_prefix {
            return Err(RolloutError::Config(
                "transform and rollout command prefixes must differ".to_string(),
            ));
        }
        Ok(())
    }

    /// Parse and validate TOML
    ///
    /// # Errors
    /// [`RolloutError::Config`] on parse or validation failure
    pub fn from_toml_str(raw: &str) -> Result<Self, RolloutError> {
        let config: Self = toml::from_str(raw).map_err(|e| RolloutError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// [`RolloutError::Config`] on I/O, parse or validation failure
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, RolloutError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RolloutError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            max_concurrent_loads: 16,
            proposal_ttl_secs: None,
            proposal_capacity: 10_000,
            transform_command_prefix: "tr".to_string(),
            rollout_command_prefix: "rollout".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = RolloutConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_concurrent_loads, 16);
        assert_eq!(config.proposal_ttl(), None);
    }

    #[test]
    fn zero_concurrency_rejected() {
        let config = RolloutConfig::new().with_max_concurrent_loads(0);
        assert!(matches!(config.validate(), Err(RolloutError::Config(_))));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = RolloutConfig::from_toml_str("proposal_ttl_secs = 3600\n").unwrap();
        assert_eq!(config.proposal_ttl(), Some(Duration::from_secs(3600)));
        assert_eq!(config.rollout_command_prefix, "rollout");
    }

    #[test]
    fn same_prefixes_rejected() {
        let raw = "transform_command_prefix = \"x\"\nrollout_command_prefix = \"x\"\n";
        assert!(RolloutConfig::from_toml_str(raw).is_err());
    }

    #[test]
    fn reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_concurrent_loads = 4").unwrap();
        let config = RolloutConfig::from_toml_file(file.path()).unwrap();
        assert_eq!(config.max_concurrent_loads, 4);
    }

    #[test]
    fn missing_file_is_config_error() {
        let res = RolloutConfig::from_toml_file("/definitely/not/here.toml");
        assert!(matches!(res, Err(RolloutError::Config(_))));
    }
}

//! Fleet described in TOML
//!
//! ```toml
//! feature = "runtime"
//! ideal = "1.0"
//! push = "acme/api"
//!
//! [rollout]
//! max_concurrent_loads = 4
//!
//! [[repos]]
//! owner = "acme"
//! name = "api"
//! version = "2.0"
//! ```
//!
//! Repositories live in memory for the duration of one run. A repository
//! marked `unreachable` fails to load, which exercises fan-out isolation.

use crate::demo::VERSION_FILE;
use cascade_core::{MemoryFleet, RolloutConfig, RolloutError};
use cascade_feature::{MemoryProject, RepoRef};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Fleet description errors
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    /// File could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        /// Offending path
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// TOML did not parse
    #[error("invalid fleet description: {0}")]
    Parse(#[from] toml::de::Error),

    /// `push` is not of the form `owner/name`
    #[error("invalid repository reference '{0}', expected owner/name")]
    InvalidRepo(String),

    /// `push` names a repository not in `repos`
    #[error("pushed repository '{0}' is not part of the fleet")]
    UnknownRepo(String),

    /// Embedded rollout configuration is invalid
    #[error(transparent)]
    Rollout(#[from] RolloutError),
}

/// One repository of the fleet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetRepo {
    /// Owner
    pub owner: String,
    /// Name
    pub name: String,
    /// Content of the `VERSION` file; absent means the feature is absent
    #[serde(default)]
    pub version: Option<String>,
    /// Loads of this repository fail
    #[serde(default)]
    pub unreachable: bool,
}

impl FleetRepo {
    /// Reference to this repository
    #[inline]
    #[must_use]
    pub fn repo_ref(&self) -> RepoRef {
        RepoRef::new(self.owner.as_str(), self.name.as_str())
    }
}

/// Whole simulation input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Feature name
    #[serde(default = "default_feature")]
    pub feature: String,
    /// Initial ideal version
    #[serde(default)]
    pub ideal: Option<String>,
    /// Repository that pushes, as `owner/name`
    pub push: String,
    /// Engine configuration
    #[serde(default)]
    pub rollout: RolloutConfig,
    /// Repositories
    #[serde(default)]
    pub repos: Vec<FleetRepo>,
}

fn default_feature() -> String {
    "runtime".to_string()
}

impl FleetConfig {
    /// Parse and validate
    ///
    /// # Errors
    /// [`FleetError`] on parse or validation failure
    pub fn from_toml_str(raw: &str) -> Result<Self, FleetError> {
        let config: Self = toml::from_str(raw)?;
        config.rollout.validate()?;
        config.pushed()?;
        Ok(config)
    }

    /// Read, parse and validate
    ///
    /// # Errors
    /// [`FleetError`] on I/O, parse or validation failure
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FleetError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| FleetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    /// Seed an in-memory fleet with these repositories, in order
    #[must_use]
    pub fn build_fleet(&self) -> MemoryFleet {
        let fleet = MemoryFleet::new();
        for repo in &self.repos {
            let id = repo.repo_ref();
            let mut project = MemoryProject::new(id.clone());
            if let Some(version) = &repo.version {
                project = project.with_file(VERSION_FILE, format!("{version}\n"));
            }
            fleet.add(project);
            if repo.unreachable {
                fleet.mark_unreachable(id);
            }
        }
        fleet
    }

    /// Reference of the pushing repository
    ///
    /// # Errors
    /// [`FleetError::InvalidRepo`] or [`FleetError::UnknownRepo`]
    pub fn pushed(&self) -> Result<RepoRef, FleetError> {
        let (owner, name) = self
            .push
            .split_once('/')
            .filter(|(o, n)| !o.is_empty() && !n.is_empty())
            .ok_or_else(|| FleetError::InvalidRepo(self.push.clone()))?;
        let pushed = RepoRef::new(owner, name);
        if self.repos.iter().any(|r| r.repo_ref() == pushed) {
            Ok(pushed)
        } else {
            Err(FleetError::UnknownRepo(self.push.clone()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascade_core::{Credentials, LoadMode, ProjectLoader, RepoFinder, RolloutContext};
    use cascade_feature::{Project, ProjectError};

    const FLEET: &str = r#"
ideal = "1.0"
push = "acme/api"

[rollout]
max_concurrent_loads = 2

[[repos]]
owner = "acme"
name = "api"
version = "2.0"

[[repos]]
owner = "acme"
name = "web"
unreachable = true
"#;

    #[test]
    fn parses_with_defaults() {
        let config = FleetConfig::from_toml_str(FLEET).unwrap();
        assert_eq!(config.feature, "runtime");
        assert_eq!(config.rollout.max_concurrent_loads, 2);
        assert_eq!(config.rollout.rollout_command_prefix, "rollout");
        assert_eq!(config.pushed().unwrap(), RepoRef::new("acme", "api"));
        assert!(config.repos[1].unreachable);
        assert_eq!(config.repos[1].version, None);
    }

    #[test]
    fn push_must_be_in_fleet() {
        let raw = FLEET.replace("acme/api", "acme/nope");
        assert!(matches!(
            FleetConfig::from_toml_str(&raw),
            Err(FleetError::UnknownRepo(_))
        ));
        let raw = FLEET.replace("acme/api", "acme");
        assert!(matches!(
            FleetConfig::from_toml_str(&raw),
            Err(FleetError::InvalidRepo(_))
        ));
    }

    #[test]
    fn invalid_rollout_section_rejected() {
        let raw = FLEET.replace("max_concurrent_loads = 2", "max_concurrent_loads = 0");
        assert!(matches!(
            FleetConfig::from_toml_str(&raw),
            Err(FleetError::Rollout(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_repo_fails_to_load() {
        let fleet = FleetConfig::from_toml_str(FLEET).unwrap().build_fleet();
        assert_eq!(
            fleet.find_repos(&RolloutContext::default()).await.unwrap(),
            vec![RepoRef::new("acme", "api"), RepoRef::new("acme", "web")]
        );
        let creds = Credentials::default();
        let err = fleet
            .load(&creds, &RepoRef::new("acme", "web"), LoadMode::ReadOnly)
            .await
            .unwrap_err();
        assert!(matches!(err, ProjectError::Load { .. }));

        let api = fleet
            .load(&creds, &RepoRef::new("acme", "api"), LoadMode::ReadOnly)
            .await
            .unwrap();
        assert!(api.is_read_only());
        assert_eq!(api.file(VERSION_FILE).as_deref(), Some("2.0\n"));
    }
}

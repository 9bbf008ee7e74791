//! Invitations and command naming
//!
//! An [`Invitation`] is an actionable message: text for a human plus the
//! command id and parameters to invoke if they accept. Parameters stay small
//! (a storage key, a repository coordinate) so they fit in chat buttons.

use cascade_feature::{Feature, Fingerprint, RepoRef};
use cascade_store::StorageKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Parameter carrying a proposal's storage key
pub const STORAGE_KEY_PARAM: &str = "storageKey";
/// Parameter carrying the target repository owner
pub const TARGET_OWNER_PARAM: &str = "targets.owner";
/// Parameter carrying the target repository name
pub const TARGET_REPO_PARAM: &str = "targets.repo";
/// Parameter carrying the target branch
pub const TARGET_BRANCH_PARAM: &str = "targets.branch";

/// Actionable proposal addressed to one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invitation {
    /// Repository whose channels should see this
    pub addressed_to: RepoRef,
    /// Message text
    pub text: String,
    /// Label of the accept control
    pub action_label: String,
    /// Command invoked on accept
    pub action_id: String,
    /// Command parameters
    pub action_parameters: BTreeMap<String, String>,
}

impl Invitation {
    /// Invitation to promote a candidate to the new ideal
    #[must_use]
    pub fn new_ideal(
        feature: &dyn Feature,
        candidate: &Fingerprint,
        ideal: &Fingerprint,
        storage_key: &StorageKey,
        rollout_command: &str,
        addressed_to: RepoRef,
    ) -> Self {
        let mut action_parameters = BTreeMap::new();
        action_parameters.insert(STORAGE_KEY_PARAM.to_string(), storage_key.to_string());
        Self {
            addressed_to,
            text: format!(
                "Set new ideal for feature *{}*: {} vs existing {}",
                feature.name(),
                feature.summary(candidate),
                feature.summary(ideal),
            ),
            action_label: format!("Accept feature {}", feature.name()),
            action_id: rollout_command.to_string(),
            action_parameters,
        }
    }

    /// Invitation for a lagging repository to converge to the ideal
    #[must_use]
    pub fn converge(
        feature: &dyn Feature,
        existing: &Fingerprint,
        ideal: &Fingerprint,
        transform_command: &str,
        repo: &RepoRef,
    ) -> Self {
        let mut action_parameters = BTreeMap::new();
        action_parameters.insert(TARGET_OWNER_PARAM.to_string(), repo.owner.clone());
        action_parameters.insert(TARGET_REPO_PARAM.to_string(), repo.name.clone());
        if let Some(branch) = &repo.branch {
            action_parameters.insert(TARGET_BRANCH_PARAM.to_string(), branch.clone());
        }
        Self {
            addressed_to: repo.clone(),
            text: format!(
                "Accept new feature *{}*: {} vs existing {}?",
                feature.name(),
                feature.summary(ideal),
                feature.summary(existing),
            ),
            action_label: format!("Accept feature {}?", feature.name()),
            action_id: transform_command.to_string(),
            action_parameters,
        }
    }

    /// Plain message without an action
    #[must_use]
    pub fn notice(addressed_to: RepoRef, text: impl Into<String>) -> Self {
        Self {
            addressed_to,
            text: text.into(),
            action_label: String::new(),
            action_id: String::new(),
            action_parameters: BTreeMap::new(),
        }
    }

    /// Whether accepting this invokes a command
    #[inline]
    #[must_use]
    pub fn is_actionable(&self) -> bool {
        !self.action_id.is_empty()
    }

    /// Parameter value by name
    #[inline]
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.action_parameters.get(name).map(String::as_str)
    }
}

/// Per-feature command names
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandNames {
    transform_prefix: String,
    rollout_prefix: String,
}

impl CommandNames {
    /// Create with explicit prefixes
    #[inline]
    #[must_use]
    pub fn new(transform_prefix: impl Into<String>, rollout_prefix: impl Into<String>) -> Self {
        Self {
            transform_prefix: transform_prefix.into(),
            rollout_prefix: rollout_prefix.into(),
        }
    }

    /// Command converging one repository to the ideal, e.g. `tr-spring_boot`
    #[must_use]
    pub fn transform(&self, feature_name: &str) -> String {
        format!("{}-{}", self.transform_prefix, slug(feature_name))
    }

    /// Command approving a proposal and fanning out, e.g. `rollout-spring_boot`
    #[must_use]
    pub fn rollout(&self, feature_name: &str) -> String {
        format!("{}-{}", self.rollout_prefix, slug(feature_name))
    }
}

impl Default for CommandNames {
    fn default() -> Self {
        Self::new("tr", "rollout")
    }
}

fn slug(feature_name: &str) -> String {
    feature_name.replace(' ', "_")
}

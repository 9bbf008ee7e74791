//! Error types for Cascade Core
//!
//! Provides error handling for:
//! - Unknown or mismatched proposals on approval
//! - Feature misuse (unsupported comparison policies are fatal)
//! - Collaborator failures (repository finder, loader, invitation sink)
//! - Configuration problems

use cascade_feature::{FeatureError, ProjectError};
use cascade_store::StoreError;

/// Main rollout error type
#[derive(Debug, thiserror::Error)]
pub enum RolloutError {
    /// Approval referenced a key with no stored proposal
    #[error("no proposal stored under key '{key}'")]
    UnknownProposal {
        /// The key that was approved
        key: String,
    },

    /// Approved proposal belongs to another feature
    #[error("proposal is for feature '{found}', not '{expected}'")]
    FeatureMismatch {
        /// Feature named by the approval
        expected: String,
        /// Feature carried by the stored fingerprint
        found: String,
    },

    /// Feature cannot converge projects, so it cannot be rolled out
    #[error("feature '{0}' has no convergence transform")]
    NoConvergenceTransform(String),

    /// Action id not recognised
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Action invoked without a required parameter
    #[error("command '{command}' is missing parameter '{parameter}'")]
    MissingParameter {
        /// Command name
        command: String,
        /// Parameter name
        parameter: String,
    },

    /// Feature error
    #[error(transparent)]
    Feature(#[from] FeatureError),

    /// Project loading or writing failed
    #[error(transparent)]
    Project(#[from] ProjectError),

    /// Store backend failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Repository enumeration failed
    #[error("repository finder failed: {0}")]
    RepoFinder(String),

    /// Invitation could not be delivered
    #[error("invitation delivery failed: {0}")]
    Sink(String),

    /// Possible-new-ideal observer failed
    #[error("listener failed: {0}")]
    Listener(String),

    /// Per-repository task panicked or was aborted
    #[error("fan-out task failed: {0}")]
    TaskFailed(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl RolloutError {
    /// Whether this error is a caller bug that must not be swallowed
    #[inline]
    #[must_use]
    pub fn is_programming_error(&self) -> bool {
        match self {
            Self::Feature(e) => e.is_programming_error(),
            _ => false,
        }
    }

    /// Create missing-parameter error
    #[inline]
    pub fn missing_parameter(command: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::MissingParameter {
            command: command.into(),
            parameter: parameter.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascade_feature::ComparisonPolicy;

    #[test]
    fn unsupported_policy_is_programming_error() {
        let err: RolloutError = FeatureError::UnsupportedPolicy {
            feature: "boot".to_string(),
            policy: ComparisonPolicy::Quality,
        }
        .into();
        assert!(err.is_programming_error());
    }

    #[test]
    fn unknown_proposal_display() {
        let err = RolloutError::UnknownProposal {
            key: "3_key".to_string(),
        };
        assert!(err.to_string().contains("3_key"));
        assert!(!err.is_programming_error());
    }

    #[test]
    fn project_error_converts() {
        let err: RolloutError = ProjectError::NotFound("acme/api".to_string()).into();
        assert!(matches!(err, RolloutError::Project(ProjectError::NotFound(_))));
    }
}

//! Error types for the feature contract
//!
//! Two families:
//! - [`FeatureError`]: misuse of a feature (unsupported policy, unknown scale,
//!   fingerprinting or transform failures)
//! - [`ProjectError`]: failures reading or writing project content

use crate::policy::ComparisonPolicy;

/// Errors raised by features and the feature registry
#[derive(Debug, thiserror::Error)]
pub enum FeatureError {
    /// The feature does not declare the requested comparison policy.
    ///
    /// This is a programming error and must never be defaulted away.
    #[error("feature '{feature}' does not support comparison policy '{policy}'")]
    UnsupportedPolicy {
        /// Feature name
        feature: String,
        /// Requested policy
        policy: ComparisonPolicy,
    },

    /// No rater registered for the requested scale
    #[error("feature '{feature}' does not support rating scale '{scale}'")]
    UnsupportedRatingScale {
        /// Feature name
        feature: String,
        /// Requested scale name
        scale: String,
    },

    /// A rater produced a level that is not on its scale
    #[error("rating '{level}' is not a level of scale '{scale}'")]
    RatingOutOfScale {
        /// Scale name
        scale: String,
        /// Offending level
        level: String,
    },

    /// A fingerprint of another feature was handed to this feature
    #[error("feature '{feature}' cannot compare fingerprint of '{found}'")]
    ForeignFingerprint {
        /// Feature doing the comparison
        feature: String,
        /// Name carried by the fingerprint
        found: String,
    },

    /// Feature name registered twice
    #[error("duplicate feature: {0}")]
    DuplicateFeature(String),

    /// Feature not present in the registry
    #[error("unknown feature: {0}")]
    UnknownFeature(String),

    /// Feature names must be non-empty
    #[error("invalid feature name: {0:?}")]
    InvalidName(String),

    /// Fingerprinting a project failed
    #[error("fingerprinting '{feature}' failed: {reason}")]
    Fingerprint {
        /// Feature name
        feature: String,
        /// Failure description
        reason: String,
    },

    /// Applying a transform failed
    #[error("transform for '{feature}' failed: {reason}")]
    Transform {
        /// Feature name
        feature: String,
        /// Failure description
        reason: String,
    },

    /// Payload could not be (de)serialized
    #[error("payload error: {0}")]
    Payload(#[from] serde_json::Error),

    /// Underlying project access failed
    #[error(transparent)]
    Project(#[from] ProjectError),
}

impl FeatureError {
    /// Whether this error indicates a caller bug rather than a runtime condition
    #[inline]
    #[must_use]
    pub fn is_programming_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedPolicy { .. }
                | Self::UnsupportedRatingScale { .. }
                | Self::ForeignFingerprint { .. }
        )
    }

    /// Create fingerprint failure
    #[inline]
    pub fn fingerprint(feature: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fingerprint {
            feature: feature.into(),
            reason: reason.into(),
        }
    }

    /// Create transform failure
    #[inline]
    pub fn transform(feature: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transform {
            feature: feature.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while accessing project content
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProjectError {
    /// Repository could not be found by the loader
    #[error("repository not found: {0}")]
    NotFound(String),

    /// Write attempted on a read-only checkout
    #[error("project {0} is read-only")]
    ReadOnly(String),

    /// Loader failed for any other reason
    #[error("failed to load {repo}: {reason}")]
    Load {
        /// Repository display name
        repo: String,
        /// Failure description
        reason: String,
    },
}

//! The [`Feature`] contract
//!
//! A feature is a named, versioned dimension of repository state. It knows
//! how to fingerprint a project, how to order two fingerprints under each
//! policy it supports, and optionally how to converge a project to a target
//! fingerprint or remove the feature altogether.

use crate::error::FeatureError;
use crate::fingerprint::Fingerprint;
use crate::policy::ComparisonPolicy;
use crate::project::{Project, ProjectTransform};
use crate::rating::{Rating, RatingScale};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Capability set every feature exposes
#[async_trait::async_trait]
pub trait Feature: Send + Sync + fmt::Debug {
    /// Unique feature name
    fn name(&self) -> &str;

    /// Version of the fingerprinting logic.
    ///
    /// Independent of the fingerprinted value's own version: a 0.1.0 feature
    /// may understand every 1.x release of the thing it fingerprints.
    fn version(&self) -> &str;

    /// Human-readable summary of a fingerprint
    fn summary(&self, fingerprint: &Fingerprint) -> String {
        fingerprint.data().to_string()
    }

    /// Fingerprint a project, `None` when the feature is absent.
    ///
    /// Must be deterministic for a fixed project state.
    async fn fingerprint(&self, project: &dyn Project) -> Result<Option<Fingerprint>, FeatureError>;

    /// Whether the feature could apply to this project at all
    async fn is_relevant(&self, _project: &dyn Project) -> bool {
        true
    }

    /// Whether the feature is present, in any version
    async fn is_present(&self, project: &dyn Project) -> Result<bool, FeatureError> {
        Ok(self.fingerprint(project).await?.is_some())
    }

    /// Policies accepted by [`Feature::compare`]
    fn supported_policies(&self) -> Vec<ComparisonPolicy>;

    /// Whether `policy` is supported
    fn supports(&self, policy: ComparisonPolicy) -> bool {
        self.supported_policies().contains(&policy)
    }

    /// Three-way comparison; `Less` means `a` is worse than `b`.
    ///
    /// # Errors
    /// [`FeatureError::UnsupportedPolicy`] when `policy` is not declared.
    fn compare(
        &self,
        a: &Fingerprint,
        b: &Fingerprint,
        policy: ComparisonPolicy,
    ) -> Result<Ordering, FeatureError>;

    /// Scales accepted by [`Feature::rate`]
    fn supported_rating_scales(&self) -> Vec<RatingScale> {
        Vec::new()
    }

    /// Rate a fingerprint on a scale
    fn rate(&self, _fingerprint: &Fingerprint, scale: &RatingScale) -> Result<Rating, FeatureError> {
        Err(FeatureError::UnsupportedRatingScale {
            feature: self.name().to_string(),
            scale: scale.name().to_string(),
        })
    }

    /// Transform that moves a project to `target`, if the feature can do that
    fn convergence_transform(&self, _target: &Fingerprint) -> Option<Arc<dyn ProjectTransform>> {
        None
    }

    /// Whether [`Feature::convergence_transform`] is available
    fn can_converge(&self) -> bool;

    /// Transform removing the feature from a project
    fn removal_transform(&self) -> Option<Arc<dyn ProjectTransform>> {
        None
    }

    /// Distinct fingerprints by content, first occurrence wins
    fn distinct(&self, fingerprints: &[Fingerprint]) -> Vec<Fingerprint> {
        let mut seen = HashSet::new();
        fingerprints
            .iter()
            .filter(|fp| seen.insert(fp.sha().to_string()))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug)]
    struct Bare;

    #[async_trait::async_trait]
    impl Feature for Bare {
        fn name(&self) -> &str {
            "bare"
        }

        fn version(&self) -> &str {
            "0.0.1"
        }

        async fn fingerprint(&self, _project: &dyn Project) -> Result<Option<Fingerprint>, FeatureError> {
            Ok(None)
        }

        fn supported_policies(&self) -> Vec<ComparisonPolicy> {
            vec![ComparisonPolicy::Size]
        }

        fn compare(
            &self,
            _a: &Fingerprint,
            _b: &Fingerprint,
            policy: ComparisonPolicy,
        ) -> Result<Ordering, FeatureError> {
            Err(FeatureError::UnsupportedPolicy {
                feature: self.name().to_string(),
                policy,
            })
        }

        fn can_converge(&self) -> bool {
            false
        }
    }

    #[test]
    fn defaults() {
        let f = Bare;
        assert!(f.supports(ComparisonPolicy::Size));
        assert!(!f.supports(ComparisonPolicy::Quality));
        assert!(f.removal_transform().is_none());
        assert!(f.supported_rating_scales().is_empty());
        let fp = Fingerprint::new("bare", "b", "0.0.1", json!(1));
        assert!(f.convergence_transform(&fp).is_none());
        assert!(matches!(
            f.rate(&fp, &RatingScale::traffic_light()),
            Err(FeatureError::UnsupportedRatingScale { .. })
        ));
    }

    #[test]
    fn distinct_dedupes_by_content() {
        let a = Fingerprint::new("bare", "b", "0.0.1", json!(1));
        let b = Fingerprint::new("bare", "b", "0.0.1", json!(2));
        let out = Bare.distinct(&[a.clone(), b.clone(), a.clone()]);
        assert_eq!(out, vec![a, b]);
    }
}

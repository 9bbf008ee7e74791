//! Closure-backed [`Feature`] implementation
//!
//! [`FeatureDefinition`] assembles a feature from plain functions: a
//! fingerprinter, optional relevance predicate, one comparator per policy,
//! raters, and optional convergence/removal transforms. Most concrete
//! features are a single `FeatureDefinition::builder(..)` chain.

use crate::error::FeatureError;
use crate::feature::Feature;
use crate::fingerprint::Fingerprint;
use crate::policy::{Comparator, ComparisonPolicy};
use crate::project::{Project, ProjectTransform};
use crate::rating::{Rater, Rating, RatingScale};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Extracts a fingerprint from project content
pub type Fingerprinter =
    Arc<dyn Fn(&dyn Project) -> Result<Option<Fingerprint>, FeatureError> + Send + Sync>;

/// Predicate over project content
pub type ProjectPredicate = Arc<dyn Fn(&dyn Project) -> bool + Send + Sync>;

/// Builds a transform converging a project to a target fingerprint
pub type ConvergenceFactory = Arc<dyn Fn(&Fingerprint) -> Arc<dyn ProjectTransform> + Send + Sync>;

/// Renders a fingerprint for humans
pub type Summarizer = Arc<dyn Fn(&Fingerprint) -> String + Send + Sync>;

/// Feature assembled from functions
#[derive(Clone)]
pub struct FeatureDefinition {
    name: String,
    version: String,
    fingerprinter: Fingerprinter,
    relevant: Option<ProjectPredicate>,
    present: Option<ProjectPredicate>,
    comparisons: Vec<(ComparisonPolicy, Comparator)>,
    raters: Vec<(RatingScale, Rater)>,
    convergence: Option<ConvergenceFactory>,
    removal: Option<Arc<dyn ProjectTransform>>,
    summarizer: Option<Summarizer>,
}

impl fmt::Debug for FeatureDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureDefinition")
            .field("name", &self.name)
            .field("version", &self.version)
            .field(
                "policies",
                &self.comparisons.iter().map(|(p, _)| *p).collect::<Vec<_>>(),
            )
            .field(
                "scales",
                &self.raters.iter().map(|(s, _)| s.name()).collect::<Vec<_>>(),
            )
            .field("can_converge", &self.convergence.is_some())
            .field("can_remove", &self.removal.is_some())
            .finish_non_exhaustive()
    }
}

impl FeatureDefinition {
    /// Start building a feature
    ///
    /// # Errors
    /// [`FeatureError::InvalidName`] if `name` is blank
    pub fn builder<F>(
        name: impl Into<String>,
        version: impl Into<String>,
        fingerprinter: F,
    ) -> Result<FeatureDefinitionBuilder, FeatureError>
    where
        F: Fn(&dyn Project) -> Result<Option<Fingerprint>, FeatureError> + Send + Sync + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(FeatureError::InvalidName(name));
        }
        Ok(FeatureDefinitionBuilder {
            inner: Self {
                name,
                version: version.into(),
                fingerprinter: Arc::new(fingerprinter),
                relevant: None,
                present: None,
                comparisons: Vec::new(),
                raters: Vec::new(),
                convergence: None,
                removal: None,
                summarizer: None,
            },
        })
    }

    fn comparator(&self, policy: ComparisonPolicy) -> Result<&Comparator, FeatureError> {
        self.comparisons
            .iter()
            .find(|(p, _)| *p == policy)
            .map(|(_, c)| c)
            .ok_or_else(|| FeatureError::UnsupportedPolicy {
                feature: self.name.clone(),
                policy,
            })
    }

    fn check_owned(&self, fingerprint: &Fingerprint) -> Result<(), FeatureError> {
        if fingerprint.name() == self.name {
            Ok(())
        } else {
            Err(FeatureError::ForeignFingerprint {
                feature: self.name.clone(),
                found: fingerprint.name().to_string(),
            })
        }
    }
}

#[async_trait::async_trait]
impl Feature for FeatureDefinition {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn summary(&self, fingerprint: &Fingerprint) -> String {
        match &self.summarizer {
            Some(summarize) => summarize(fingerprint),
            None => fingerprint.data().to_string(),
        }
    }

    async fn fingerprint(&self, project: &dyn Project) -> Result<Option<Fingerprint>, FeatureError> {
        (self.fingerprinter)(project)
    }

    async fn is_relevant(&self, project: &dyn Project) -> bool {
        self.relevant.as_ref().map_or(true, |relevant| relevant(project))
    }

    async fn is_present(&self, project: &dyn Project) -> Result<bool, FeatureError> {
        match &self.present {
            Some(present) => Ok(present(project)),
            None => Ok((self.fingerprinter)(project)?.is_some()),
        }
    }

    fn supported_policies(&self) -> Vec<ComparisonPolicy> {
        self.comparisons.iter().map(|(p, _)| *p).collect()
    }

    fn compare(
        &self,
        a: &Fingerprint,
        b: &Fingerprint,
        policy: ComparisonPolicy,
    ) -> Result<Ordering, FeatureError> {
        let compare = self.comparator(policy)?;
        self.check_owned(a)?;
        self.check_owned(b)?;
        Ok(compare(a, b))
    }

    fn supported_rating_scales(&self) -> Vec<RatingScale> {
        self.raters.iter().map(|(s, _)| s.clone()).collect()
    }

    fn rate(&self, fingerprint: &Fingerprint, scale: &RatingScale) -> Result<Rating, FeatureError> {
        let (scale, rate) = self
            .raters
            .iter()
            .find(|(s, _)| s.name() == scale.name())
            .ok_or_else(|| FeatureError::UnsupportedRatingScale {
                feature: self.name.clone(),
                scale: scale.name().to_string(),
            })?;
        scale.rating(&rate(fingerprint))
    }

    fn convergence_transform(&self, target: &Fingerprint) -> Option<Arc<dyn ProjectTransform>> {
        self.convergence.as_ref().map(|build| build(target))
    }

    fn can_converge(&self) -> bool {
        self.convergence.is_some()
    }

    fn removal_transform(&self) -> Option<Arc<dyn ProjectTransform>> {
        self.removal.clone()
    }
}

/// Builder for [`FeatureDefinition`]
#[derive(Debug)]
pub struct FeatureDefinitionBuilder {
    inner: FeatureDefinition,
}

impl FeatureDefinitionBuilder {
    /// Restrict relevance; features are relevant everywhere by default
    #[must_use]
    pub fn relevant_when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&dyn Project) -> bool + Send + Sync + 'static,
    {
        self.inner.relevant = Some(Arc::new(predicate));
        self
    }

    /// Cheap presence test used to gate push detection. Defaults to
    /// "the fingerprinter finds something".
    #[must_use]
    pub fn present_when<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&dyn Project) -> bool + Send + Sync + 'static,
    {
        self.inner.present = Some(Arc::new(predicate));
        self
    }

    /// Support a comparison policy. A later registration for the same policy
    /// replaces the earlier one.
    #[must_use]
    pub fn compare_by<C>(mut self, policy: ComparisonPolicy, compare: C) -> Self
    where
        C: Fn(&Fingerprint, &Fingerprint) -> Ordering + Send + Sync + 'static,
    {
        self.inner.comparisons.retain(|(p, _)| *p != policy);
        self.inner.comparisons.push((policy, Arc::new(compare)));
        self
    }

    /// Support a rating scale
    #[must_use]
    pub fn rate_on<R>(mut self, scale: RatingScale, rate: R) -> Self
    where
        R: Fn(&Fingerprint) -> String + Send + Sync + 'static,
    {
        self.inner.raters.retain(|(s, _)| s.name() != scale.name());
        self.inner.raters.push((scale, Arc::new(rate)));
        self
    }

    /// Enable convergence to a target value
    #[must_use]
    pub fn converge_with<B>(mut self, build: B) -> Self
    where
        B: Fn(&Fingerprint) -> Arc<dyn ProjectTransform> + Send + Sync + 'static,
    {
        self.inner.convergence = Some(Arc::new(build));
        self
    }

    /// Enable removal
    #[must_use]
    pub fn remove_with(mut self, transform: Arc<dyn ProjectTransform>) -> Self {
        self.inner.removal = Some(transform);
        self
    }

    /// Custom summary
    #[must_use]
    pub fn summarize_with<S>(mut self, summarize: S) -> Self
    where
        S: Fn(&Fingerprint) -> String + Send + Sync + 'static,
    {
        self.inner.summarizer = Some(Arc::new(summarize));
        self
    }

    /// Finish
    #[must_use]
    pub fn build(self) -> FeatureDefinition {
        self.inner
    }
}

//! Rollout strategies
//!
//! A strategy supplies the observer that presents proposals for approval,
//! and performs the fleet-wide fan-out once a new ideal is approved.

use crate::collaborators::{InvitationSink, ProjectLoader, RepoFinder, RolloutContext};
use crate::error::RolloutError;
use crate::fanout::{do_with_repos, FanOutReport, RepoOutcome};
use crate::invitation::Invitation;
use crate::listener::{InvitingListener, PossibleNewIdealListener};
use cascade_feature::{ComparisonPolicy, Feature, FeatureError, Fingerprint};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Rolls a new ideal out across the fleet
#[async_trait::async_trait]
pub trait RolloutStrategy: Send + Sync + fmt::Debug {
    /// Observer that presents proposals for approval
    fn listener(&self) -> Arc<dyn PossibleNewIdealListener>;

    /// Offer `target` to every repository that lags it
    ///
    /// # Errors
    /// - [`FeatureError::UnsupportedPolicy`] when the feature cannot be ordered by quality
    /// - [`RolloutError::RepoFinder`] when the fleet cannot be enumerated
    async fn rollout(
        &self,
        feature: Arc<dyn Feature>,
        target: Fingerprint,
        transform_command: &str,
        ctx: &RolloutContext,
    ) -> Result<FanOutReport, RolloutError>;
}

/// Invites each lagging repository to run the convergence command
#[derive(Debug, Clone)]
pub struct InvitationRolloutStrategy {
    finder: Arc<dyn RepoFinder>,
    loader: Arc<dyn ProjectLoader>,
    sink: Arc<dyn InvitationSink>,
    max_concurrent: usize,
}

impl InvitationRolloutStrategy {
    /// Create strategy over the fleet collaborators
    #[inline]
    #[must_use]
    pub fn new(
        finder: Arc<dyn RepoFinder>,
        loader: Arc<dyn ProjectLoader>,
        sink: Arc<dyn InvitationSink>,
    ) -> Self {
        Self {
            finder,
            loader,
            sink,
            max_concurrent: 16,
        }
    }

    /// With fan-out concurrency bound
    #[inline]
    #[must_use]
    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }
}

#[async_trait::async_trait]
impl RolloutStrategy for InvitationRolloutStrategy {
    fn listener(&self) -> Arc<dyn PossibleNewIdealListener> {
        Arc::new(InvitingListener::new(Arc::clone(&self.sink)))
    }

    async fn rollout(
        &self,
        feature: Arc<dyn Feature>,
        target: Fingerprint,
        transform_command: &str,
        ctx: &RolloutContext,
    ) -> Result<FanOutReport, RolloutError> {
        if !feature.supports(ComparisonPolicy::Quality) {
            return Err(FeatureError::UnsupportedPolicy {
                feature: feature.name().to_string(),
                policy: ComparisonPolicy::Quality,
            }
            .into());
        }
        tracing::info!(
            correlation_id = %ctx.correlation_id,
            feature = feature.name(),
            target = %feature.summary(&target),
            command = transform_command,
            "rolling out feature"
        );

        let mut report = FanOutReport::new(feature.name(), target.clone());
        let sink = Arc::clone(&self.sink);
        let command = transform_command.to_string();
        let action_feature = Arc::clone(&feature);
        let results = do_with_repos(
            self.finder.as_ref(),
            Arc::clone(&self.loader),
            ctx,
            self.max_concurrent,
            move |project| {
                let feature = Arc::clone(&action_feature);
                let target = target.clone();
                let sink = Arc::clone(&sink);
                let command = command.clone();
                async move {
                    let Some(existing) = feature.fingerprint(project.as_ref()).await? else {
                        return Ok(RepoOutcome::Absent);
                    };
                    if feature.compare(&existing, &target, ComparisonPolicy::Quality)?
                        != Ordering::Less
                    {
                        return Ok(RepoOutcome::UpToDate);
                    }
                    let invitation =
                        Invitation::converge(feature.as_ref(), &existing, &target, &command, project.id());
                    sink.deliver(invitation.clone()).await?;
                    Ok(RepoOutcome::Invited(invitation))
                }
            },
        )
        .await?;

        for result in results {
            report.record(result);
        }
        tracing::info!(
            feature = feature.name(),
            scanned = report.scanned,
            invited = report.invited.len(),
            up_to_date = report.up_to_date.len(),
            absent = report.absent.len(),
            failed = report.failed.len(),
            "rollout complete"
        );
        Ok(report)
    }
}

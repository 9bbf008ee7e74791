//! Push-driven rollout coordinator
//!
//! Runs once per qualifying push and per feature:
//!
//! ```text
//! Detect ──► Compare ──► Unremarkable
//!                   └──► Propose (store candidate, notify observers)
//! ```
//!
//! Every path is terminal. Only `Propose` writes to a store.

use crate::collaborators::RolloutContext;
use crate::error::RolloutError;
use crate::invitation::CommandNames;
use crate::listener::{PossibleNewIdeal, PossibleNewIdealListener};
use cascade_feature::{ComparisonPolicy, Feature, Fingerprint, Project};
use cascade_store::{IdealStore, StorageKey, ValueStore};
use futures::future::join_all;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// Terminal state of one coordinator run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// Presence predicate false; nothing to detect
    NotPresent,
    /// Presence predicate true but no fingerprint extracted
    Anomaly,
    /// Feature cannot be ordered by quality, so it cannot drive rollout
    QualityUnsupported,
    /// No ideal to compare against yet
    NoIdeal {
        /// Value found in the pushed repository
        candidate: Fingerprint,
    },
    /// Ideal is as good or better
    Unremarkable {
        /// Current ideal
        ideal: Fingerprint,
        /// Value found in the pushed repository
        candidate: Fingerprint,
    },
    /// Candidate beats ideal and was proposed
    Proposed {
        /// Where the candidate was stored
        storage_key: StorageKey,
        /// Observers notified successfully
        notified: usize,
        /// Observers that failed
        failed: usize,
    },
}

impl PushOutcome {
    /// Whether a proposal was created
    #[inline]
    #[must_use]
    pub fn is_proposed(&self) -> bool {
        matches!(self, Self::Proposed { .. })
    }

    /// Short kebab-case name
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotPresent => "not-present",
            Self::Anomaly => "anomaly",
            Self::QualityUnsupported => "quality-unsupported",
            Self::NoIdeal { .. } => "no-ideal",
            Self::Unremarkable { .. } => "unremarkable",
            Self::Proposed { .. } => "proposed",
        }
    }
}

/// Detects better-than-ideal values on push and proposes them
pub struct RolloutCoordinator {
    values: Arc<dyn ValueStore<Fingerprint>>,
    ideals: Arc<dyn IdealStore>,
    commands: CommandNames,
    listeners: Vec<Arc<dyn PossibleNewIdealListener>>,
}

impl fmt::Debug for RolloutCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RolloutCoordinator")
            .field("values", &self.values)
            .field("ideals", &self.ideals)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl RolloutCoordinator {
    /// Create coordinator over the two shared stores
    #[inline]
    #[must_use]
    pub fn new(
        values: Arc<dyn ValueStore<Fingerprint>>,
        ideals: Arc<dyn IdealStore>,
        commands: CommandNames,
    ) -> Self {
        Self {
            values,
            ideals,
            commands,
            listeners: Vec::new(),
        }
    }

    /// Register an observer
    pub fn add_listener(&mut self, listener: Arc<dyn PossibleNewIdealListener>) {
        self.listeners.push(listener);
    }

    /// Builder-style [`RolloutCoordinator::add_listener`]
    #[inline]
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn PossibleNewIdealListener>) -> Self {
        self.add_listener(listener);
        self
    }

    /// Number of registered observers
    #[inline]
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Handle a push of `project` for one feature
    ///
    /// # Errors
    /// - Fingerprinting and store failures
    /// - [`cascade_feature::FeatureError::UnsupportedPolicy`] from a feature
    ///   that declares `quality` but cannot evaluate it
    pub async fn on_push(
        &self,
        feature: &Arc<dyn Feature>,
        project: &dyn Project,
        ctx: &RolloutContext,
    ) -> Result<PushOutcome, RolloutError> {
        let repo = project.id();
        if !feature.is_present(project).await? {
            tracing::debug!(feature = feature.name(), repo = %repo, "feature not present");
            return Ok(PushOutcome::NotPresent);
        }
        tracing::info!(feature = feature.name(), repo = %repo, "push on project with feature");

        let Some(candidate) = feature.fingerprint(project).await? else {
            tracing::warn!(
                feature = feature.name(),
                repo = %repo,
                "anomaly: presence test passed but no fingerprint was extracted"
            );
            return Ok(PushOutcome::Anomaly);
        };

        if !feature.supports(ComparisonPolicy::Quality) {
            tracing::info!(feature = feature.name(), "feature does not support quality comparison");
            return Ok(PushOutcome::QualityUnsupported);
        }

        let Some(ideal) = self.ideals.ideal(feature.name()).await? else {
            tracing::info!(feature = feature.name(), "no ideal found");
            return Ok(PushOutcome::NoIdeal { candidate });
        };

        let ordering = feature.compare(&ideal, &candidate, ComparisonPolicy::Quality)?;
        tracing::debug!(
            feature = feature.name(),
            ideal = %feature.summary(&ideal),
            candidate = %feature.summary(&candidate),
            ?ordering,
            "compared against ideal"
        );
        if ordering != Ordering::Less {
            tracing::info!(
                feature = feature.name(),
                ideal = %feature.summary(&ideal),
                candidate = %feature.summary(&candidate),
                "value is unremarkable"
            );
            return Ok(PushOutcome::Unremarkable { ideal, candidate });
        }

        let storage_key = self.values.save(candidate.clone()).await?;
        let proposal = PossibleNewIdeal {
            feature: Arc::clone(feature),
            candidate,
            ideal,
            storage_key: storage_key.clone(),
            rollout_command: self.commands.rollout(feature.name()),
            repo: repo.clone(),
            context: ctx.clone(),
        };
        let (notified, failed) = self.notify(&proposal).await;
        Ok(PushOutcome::Proposed {
            storage_key,
            notified,
            failed,
        })
    }

    /// Notify every observer; failures are logged and counted, never short-circuit
    async fn notify(&self, proposal: &PossibleNewIdeal) -> (usize, usize) {
        let results = join_all(
            self.listeners
                .iter()
                .map(|listener| listener.on_possible_new_ideal(proposal)),
        )
        .await;
        let mut failed = 0;
        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            failed += 1;
            tracing::error!(
                feature = proposal.feature.name(),
                key = %proposal.storage_key,
                error = %err,
                "possible-new-ideal listener failed"
            );
        }
        (results.len() - failed, failed)
    }
}

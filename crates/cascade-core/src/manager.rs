//! Feature manager
//!
//! Wires registry, stores, coordinator and strategy together and exposes
//! the entry points the outside world calls:
//!
//! - [`FeatureManager::on_push`]: run detection for every enabled feature
//! - [`FeatureManager::approve`]: promote a stored proposal and fan out
//! - [`FeatureManager::transform_to_ideal`]: converge one repository
//! - [`FeatureManager::dispatch`]: route an invitation action by command id
//! - [`FeatureManager::list_features`]: fingerprint a project with everything
//!
//! A feature is enabled when it can converge projects; only enabled
//! features get transform and rollout commands.

use crate::collaborators::{
    InvitationSink, LoadMode, ProjectLoader, RepoFinder, RolloutContext,
};
use crate::config::RolloutConfig;
use crate::coordinator::{PushOutcome, RolloutCoordinator};
use crate::error::RolloutError;
use crate::fanout::FanOutReport;
use crate::invitation::{
    CommandNames, Invitation, STORAGE_KEY_PARAM, TARGET_BRANCH_PARAM, TARGET_OWNER_PARAM,
    TARGET_REPO_PARAM,
};
use crate::listener::PossibleNewIdealListener;
use crate::strategy::{InvitationRolloutStrategy, RolloutStrategy};
use cascade_feature::{
    ComparisonPolicy, FeatureError, FeatureRegistry, Fingerprint, Project, RepoRef,
    TransformReport,
};
use cascade_store::{
    ExpiringValueStore, IdealStore, InMemoryIdealStore, InMemoryValueStore, StorageKey,
    ValueStore,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Result of converging one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransformOutcome {
    /// No ideal set; a notice was delivered instead
    NoIdeal,
    /// Transform ran
    Applied(TransformReport),
}

/// Result of a dispatched action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult {
    /// Rollout command: proposal approved and fanned out
    RolledOut(FanOutReport),
    /// Transform command: one repository converged
    Transformed(TransformOutcome),
}

/// Entry point of the convergence engine
#[derive(Debug)]
pub struct FeatureManager {
    registry: FeatureRegistry,
    config: RolloutConfig,
    commands: CommandNames,
    values: Arc<dyn ValueStore<Fingerprint>>,
    ideals: Arc<dyn IdealStore>,
    coordinator: RolloutCoordinator,
    strategy: Arc<dyn RolloutStrategy>,
    loader: Arc<dyn ProjectLoader>,
    sink: Arc<dyn InvitationSink>,
}

impl FeatureManager {
    /// Start building a manager over the fleet collaborators
    #[inline]
    #[must_use]
    pub fn builder(
        registry: FeatureRegistry,
        finder: Arc<dyn RepoFinder>,
        loader: Arc<dyn ProjectLoader>,
        sink: Arc<dyn InvitationSink>,
    ) -> FeatureManagerBuilder {
        FeatureManagerBuilder {
            registry,
            finder,
            loader,
            sink,
            config: RolloutConfig::default(),
            values: None,
            ideals: None,
            strategy: None,
            listeners: Vec::new(),
        }
    }

    /// Manager with in-memory stores and the invitation strategy
    ///
    /// # Errors
    /// [`RolloutError::Config`] if `config` is invalid
    pub fn in_memory(
        registry: FeatureRegistry,
        config: RolloutConfig,
        finder: Arc<dyn RepoFinder>,
        loader: Arc<dyn ProjectLoader>,
        sink: Arc<dyn InvitationSink>,
    ) -> Result<Self, RolloutError> {
        Self::builder(registry, finder, loader, sink)
            .with_config(config)
            .build()
    }

    /// Registered features
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &FeatureRegistry {
        &self.registry
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &RolloutConfig {
        &self.config
    }

    /// Command naming in use
    #[inline]
    #[must_use]
    pub fn commands(&self) -> &CommandNames {
        &self.commands
    }

    /// Proposal store
    #[inline]
    #[must_use]
    pub fn values(&self) -> &Arc<dyn ValueStore<Fingerprint>> {
        &self.values
    }

    /// Ideal store
    #[inline]
    #[must_use]
    pub fn ideals(&self) -> &Arc<dyn IdealStore> {
        &self.ideals
    }

    /// Names of features that get commands, sorted
    #[must_use]
    pub fn enabled_features(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.registry.convergent().map(|f| f.name()).collect();
        names.sort_unstable();
        names
    }

    /// Run push detection for every enabled, relevant feature.
    ///
    /// Features are evaluated independently: a fingerprinting, comparison or
    /// store failure is logged and returned in that feature's slot, and the
    /// remaining features still run.
    ///
    /// # Errors
    /// Programming errors such as [`FeatureError::UnsupportedPolicy`] abort
    /// the whole push
    pub async fn on_push(
        &self,
        project: &dyn Project,
        ctx: &RolloutContext,
    ) -> Result<Vec<(String, Result<PushOutcome, RolloutError>)>, RolloutError> {
        let mut outcomes = Vec::new();
        for feature in self.registry.convergent() {
            if !feature.is_relevant(project).await {
                tracing::trace!(feature = feature.name(), repo = %project.id(), "feature not relevant");
                continue;
            }
            let outcome = match self.coordinator.on_push(feature, project, ctx).await {
                Err(err) if err.is_programming_error() => return Err(err),
                Err(err) => {
                    tracing::warn!(
                        correlation_id = %ctx.correlation_id,
                        feature = feature.name(),
                        repo = %project.id(),
                        error = %err,
                        "push detection failed"
                    );
                    Err(err)
                }
                Ok(outcome) => Ok(outcome),
            };
            outcomes.push((feature.name().to_string(), outcome));
        }
        Ok(outcomes)
    }

    /// Approve the proposal stored under `key`: set it as the ideal and fan out.
    ///
    /// Every check runs before the ideal is touched.
    ///
    /// # Errors
    /// - [`RolloutError::UnknownProposal`] for an empty, unknown or expired key
    /// - [`RolloutError::FeatureMismatch`] if the proposal is another feature's
    /// - [`FeatureError::UnknownFeature`] and [`FeatureError::UnsupportedPolicy`]
    /// - [`RolloutError::NoConvergenceTransform`] for features that are not enabled
    /// - Repository enumeration failures, after the ideal was set
    pub async fn approve(
        &self,
        feature_name: &str,
        key: &StorageKey,
        ctx: &RolloutContext,
    ) -> Result<FanOutReport, RolloutError> {
        let feature = self.registry.require(feature_name)?;
        if key.is_empty() {
            return Err(RolloutError::UnknownProposal {
                key: key.to_string(),
            });
        }
        let candidate = self
            .values
            .load(key)
            .await?
            .ok_or_else(|| RolloutError::UnknownProposal {
                key: key.to_string(),
            })?;
        if candidate.name() != feature.name() {
            return Err(RolloutError::FeatureMismatch {
                expected: feature.name().to_string(),
                found: candidate.name().to_string(),
            });
        }
        if !feature.supports(ComparisonPolicy::Quality) {
            return Err(FeatureError::UnsupportedPolicy {
                feature: feature.name().to_string(),
                policy: ComparisonPolicy::Quality,
            }
            .into());
        }
        if !feature.can_converge() {
            return Err(RolloutError::NoConvergenceTransform(feature.name().to_string()));
        }

        tracing::info!(
            correlation_id = %ctx.correlation_id,
            feature = feature.name(),
            key = %key,
            value = %feature.summary(&candidate),
            "proposal approved"
        );
        self.ideals.set_ideal(candidate.clone()).await?;
        self.strategy
            .rollout(
                Arc::clone(feature),
                candidate,
                &self.commands.transform(feature.name()),
                ctx,
            )
            .await
    }

    /// Converge `repo` to the current ideal of `feature_name`
    ///
    /// # Errors
    /// - [`FeatureError::UnknownFeature`]
    /// - [`RolloutError::NoConvergenceTransform`]
    /// - Load, transform, commit or sink failures
    pub async fn transform_to_ideal(
        &self,
        feature_name: &str,
        repo: &RepoRef,
        ctx: &RolloutContext,
    ) -> Result<TransformOutcome, RolloutError> {
        let feature = self.registry.require(feature_name)?;
        let Some(ideal) = self.ideals.ideal(feature.name()).await? else {
            tracing::info!(feature = feature.name(), repo = %repo, "no ideal to converge to");
            self.sink
                .deliver(Invitation::notice(
                    repo.clone(),
                    format!("No ideal found for feature {}", feature.name()),
                ))
                .await?;
            return Ok(TransformOutcome::NoIdeal);
        };
        let transform = feature
            .convergence_transform(&ideal)
            .ok_or_else(|| RolloutError::NoConvergenceTransform(feature.name().to_string()))?;

        let mut project = self
            .loader
            .load(&ctx.credentials, repo, LoadMode::Writable)
            .await?;
        let report = transform.apply(project.as_mut()).await?;
        if report.edited {
            self.loader.commit(&ctx.credentials, project).await?;
        }
        tracing::info!(
            feature = feature.name(),
            repo = %repo,
            edited = report.edited,
            files = report.files_changed.len(),
            "converged to ideal"
        );
        Ok(TransformOutcome::Applied(report))
    }

    /// Route an invitation action to the matching command
    ///
    /// # Errors
    /// - [`RolloutError::UnknownCommand`] if no enabled feature owns `action_id`
    /// - [`RolloutError::MissingParameter`] for absent required parameters
    /// - Whatever the routed command fails with
    pub async fn dispatch(
        &self,
        action_id: &str,
        parameters: &BTreeMap<String, String>,
        ctx: &RolloutContext,
    ) -> Result<ActionResult, RolloutError> {
        let param = |name: &str| {
            parameters
                .get(name)
                .ok_or_else(|| RolloutError::missing_parameter(action_id, name))
        };
        for feature in self.registry.convergent() {
            if action_id == self.commands.rollout(feature.name()) {
                let key = StorageKey::new(param(STORAGE_KEY_PARAM)?.as_str());
                let report = self.approve(feature.name(), &key, ctx).await?;
                return Ok(ActionResult::RolledOut(report));
            }
            if action_id == self.commands.transform(feature.name()) {
                let mut repo = RepoRef::new(
                    param(TARGET_OWNER_PARAM)?.as_str(),
                    param(TARGET_REPO_PARAM)?.as_str(),
                );
                if let Some(branch) = parameters.get(TARGET_BRANCH_PARAM) {
                    repo = repo.with_branch(branch.as_str());
                }
                let outcome = self.transform_to_ideal(feature.name(), &repo, ctx).await?;
                return Ok(ActionResult::Transformed(outcome));
            }
        }
        Err(RolloutError::UnknownCommand(action_id.to_string()))
    }

    /// Fingerprint `project` with every registered feature.
    ///
    /// Returns the present fingerprints sorted by feature name.
    ///
    /// # Errors
    /// The first fingerprinting failure
    pub async fn list_features(&self, project: &dyn Project) -> Result<Vec<Fingerprint>, RolloutError> {
        let mut found = Vec::new();
        for feature in self.registry.iter() {
            if let Some(fp) = feature.fingerprint(project).await? {
                found.push(fp);
            }
        }
        found.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(found)
    }
}

/// Builder for [`FeatureManager`]
#[derive(Debug)]
pub struct FeatureManagerBuilder {
    registry: FeatureRegistry,
    finder: Arc<dyn RepoFinder>,
    loader: Arc<dyn ProjectLoader>,
    sink: Arc<dyn InvitationSink>,
    config: RolloutConfig,
    values: Option<Arc<dyn ValueStore<Fingerprint>>>,
    ideals: Option<Arc<dyn IdealStore>>,
    strategy: Option<Arc<dyn RolloutStrategy>>,
    listeners: Vec<Arc<dyn PossibleNewIdealListener>>,
}

impl FeatureManagerBuilder {
    /// With configuration
    #[inline]
    #[must_use]
    pub fn with_config(mut self, config: RolloutConfig) -> Self {
        self.config = config;
        self
    }

    /// With a custom proposal store
    #[inline]
    #[must_use]
    pub fn with_value_store(mut self, values: Arc<dyn ValueStore<Fingerprint>>) -> Self {
        self.values = Some(values);
        self
    }

    /// With a custom ideal store
    #[inline]
    #[must_use]
    pub fn with_ideal_store(mut self, ideals: Arc<dyn IdealStore>) -> Self {
        self.ideals = Some(ideals);
        self
    }

    /// With in-memory ideals seeded from `ideals`
    #[must_use]
    pub fn with_initial_ideals(self, ideals: impl IntoIterator<Item = Fingerprint>) -> Self {
        self.with_ideal_store(Arc::new(InMemoryIdealStore::with_ideals(ideals)))
    }

    /// With a custom rollout strategy
    #[inline]
    #[must_use]
    pub fn with_strategy(mut self, strategy: Arc<dyn RolloutStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// With an extra possible-new-ideal observer
    #[inline]
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn PossibleNewIdealListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Build the manager
    ///
    /// # Errors
    /// [`RolloutError::Config`] if the configuration is invalid
    pub fn build(self) -> Result<FeatureManager, RolloutError> {
        self.config.validate()?;
        let commands = CommandNames::new(
            self.config.transform_command_prefix.as_str(),
            self.config.rollout_command_prefix.as_str(),
        );
        let values: Arc<dyn ValueStore<Fingerprint>> = match (self.values, self.config.proposal_ttl()) {
            (Some(values), _) => values,
            (None, Some(ttl)) => Arc::new(ExpiringValueStore::<Fingerprint>::with_ttl(
                self.config.proposal_capacity,
                ttl,
            )),
            (None, None) => Arc::new(InMemoryValueStore::<Fingerprint>::new()),
        };
        let ideals: Arc<dyn IdealStore> = match self.ideals {
            Some(ideals) => ideals,
            None => Arc::new(InMemoryIdealStore::new()),
        };
        let strategy: Arc<dyn RolloutStrategy> = match self.strategy {
            Some(strategy) => strategy,
            None => Arc::new(
                InvitationRolloutStrategy::new(
                    Arc::clone(&self.finder),
                    Arc::clone(&self.loader),
                    Arc::clone(&self.sink),
                )
                .with_max_concurrent(self.config.max_concurrent_loads),
            ),
        };

        let mut coordinator =
            RolloutCoordinator::new(Arc::clone(&values), Arc::clone(&ideals), commands.clone());
        coordinator.add_listener(strategy.listener());
        for listener in self.listeners {
            coordinator.add_listener(listener);
        }
        tracing::info!(
            features = self.registry.len(),
            enabled = self.registry.convergent().count(),
            listeners = coordinator.listener_count(),
            "feature manager ready"
        );

        Ok(FeatureManager {
            registry: self.registry,
            config: self.config,
            commands,
            values,
            ideals,
            coordinator,
            strategy,
            loader: self.loader,
            sink: self.sink,
        })
    }
}

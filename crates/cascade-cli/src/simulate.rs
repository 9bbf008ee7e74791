//! One simulated push through the engine
//!
//! Push → (proposal) → optional approval and fan-out → optional convergence
//! of every invited repository.

use crate::demo::{version_feature, version_fingerprint, CollectingSink};
use crate::fleet::FleetConfig;
use anyhow::Context;
use cascade_core::{
    FanOutReport, FeatureManager, Invitation, LoadMode, ProjectLoader, PushOutcome,
    RolloutContext, TransformOutcome,
};
use cascade_feature::{FeatureRegistry, RepoRef};
use serde::Serialize;
use std::sync::Arc;

/// What to do after the push
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulateOptions {
    /// Approve a proposal as soon as it is made
    pub auto_approve: bool,
    /// Accept every fan-out invitation
    pub converge: bool,
}

/// Outcome of a simulation
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    /// Feature simulated
    pub feature: String,
    /// Repository that pushed
    pub pushed: RepoRef,
    /// Coordinator outcome label
    pub outcome: String,
    /// Key of the proposal, if one was made
    pub storage_key: Option<String>,
    /// Fan-out after approval
    pub rollout: Option<FanOutReport>,
    /// Repositories whose content changed by convergence
    pub converged: Vec<RepoRef>,
    /// Ideal at the end of the run
    pub final_ideal: Option<String>,
    /// Every message delivered during the run
    pub invitations: Vec<Invitation>,
}

impl SimulationReport {
    /// Human-readable rendering
    #[must_use]
    pub fn render_text(&self) -> String {
        let mut out = format!(
            "feature {}: push from {} was {}\n",
            self.feature, self.pushed, self.outcome
        );
        if let Some(key) = &self.storage_key {
            out.push_str(&format!("proposal stored under {key}\n"));
        }
        if let Some(rollout) = &self.rollout {
            out.push_str(&format!(
                "rollout: scanned {}, invited {}, up to date {}, absent {}, failed {}\n",
                rollout.scanned,
                rollout.invited.len(),
                rollout.up_to_date.len(),
                rollout.absent.len(),
                rollout.failed.len()
            ));
            for (repo, reason) in &rollout.failed {
                out.push_str(&format!("  failed {repo}: {reason}\n"));
            }
        }
        for repo in &self.converged {
            out.push_str(&format!("converged {repo}\n"));
        }
        match &self.final_ideal {
            Some(ideal) => out.push_str(&format!("ideal is now {ideal}\n")),
            None => out.push_str("no ideal set\n"),
        }
        out
    }
}

/// Run one simulation
///
/// # Errors
/// Invalid feature name, invalid configuration, or any engine failure other
/// than per-repository fan-out failures
pub async fn run(config: &FleetConfig, options: SimulateOptions) -> anyhow::Result<SimulationReport> {
    let pushed = config.pushed()?;
    let fleet = Arc::new(config.build_fleet());
    let sink = Arc::new(CollectingSink::new());
    let registry = FeatureRegistry::new().with(Arc::new(version_feature(&config.feature)?))?;
    let manager = FeatureManager::builder(registry, fleet.clone(), fleet.clone(), sink.clone())
        .with_config(config.rollout.clone())
        .with_initial_ideals(
            config
                .ideal
                .as_deref()
                .map(|v| version_fingerprint(&config.feature, v)),
        )
        .build()?;
    let ctx = RolloutContext::default();

    let project = fleet
        .load(&ctx.credentials, &pushed, LoadMode::ReadOnly)
        .await
        .with_context(|| format!("loading pushed repository {pushed}"))?;
    let outcome = manager
        .on_push(project.as_ref(), &ctx)
        .await?
        .into_iter()
        .find(|(name, _)| *name == config.feature)
        .map(|(_, outcome)| outcome)
        .transpose()
        .with_context(|| format!("detecting {} on {pushed}", config.feature))?;

    let mut report = SimulationReport {
        feature: config.feature.clone(),
        pushed: pushed.clone(),
        outcome: outcome
            .as_ref()
            .map_or("not-relevant", PushOutcome::label)
            .to_string(),
        storage_key: None,
        rollout: None,
        converged: Vec::new(),
        final_ideal: None,
        invitations: Vec::new(),
    };

    if let Some(PushOutcome::Proposed { storage_key, .. }) = outcome {
        report.storage_key = Some(storage_key.to_string());
        if options.auto_approve {
            let rollout = manager
                .approve(&config.feature, &storage_key, &ctx)
                .await
                .context("approving proposal")?;
            if options.converge {
                for repo in &rollout.invited {
                    let converged = manager
                        .transform_to_ideal(&config.feature, repo, &ctx)
                        .await
                        .with_context(|| format!("converging {repo}"))?;
                    if matches!(converged, TransformOutcome::Applied(ref r) if r.edited) {
                        report.converged.push(repo.clone());
                    }
                }
            }
            report.rollout = Some(rollout);
        }
    }

    report.final_ideal = manager
        .ideals()
        .ideal(&config.feature)
        .await?
        .and_then(|fp| fp.data().as_str().map(str::to_string));
    report.invitations = sink.invitations();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_mentions_outcome_and_ideal() {
        let report = SimulationReport {
            feature: "runtime".to_string(),
            pushed: RepoRef::new("acme", "api"),
            outcome: "unremarkable".to_string(),
            storage_key: None,
            rollout: None,
            converged: Vec::new(),
            final_ideal: Some("1.0".to_string()),
            invitations: Vec::new(),
        };
        let text = report.render_text();
        assert!(text.contains("push from acme/api was unremarkable"));
        assert!(text.contains("ideal is now 1.0"));
    }
}

//! Fleet fan-out
//!
//! Runs one action per accessible repository. Each repository is loaded
//! read-only in its own task, bounded by a semaphore. A failure in one
//! repository is logged and reported, never propagated to its siblings.

use crate::collaborators::{Credentials, LoadMode, ProjectLoader, RepoFinder, RolloutContext};
use crate::error::RolloutError;
use crate::invitation::Invitation;
use cascade_feature::{Fingerprint, Project, RepoRef};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Result of the action for one repository
#[derive(Debug)]
pub struct RepoResult<T> {
    /// Repository the action ran against
    pub repo: RepoRef,
    /// Action result, or the load or task failure
    pub result: Result<T, RolloutError>,
}

/// Run `action` against every repository `finder` returns.
///
/// Results come back in finder order, one per repository.
///
/// # Errors
/// Only when the fleet cannot be enumerated; per-repository failures are
/// carried in the returned [`RepoResult`]s.
pub async fn do_with_repos<T, F, Fut>(
    finder: &dyn RepoFinder,
    loader: Arc<dyn ProjectLoader>,
    ctx: &RolloutContext,
    max_concurrent: usize,
    action: F,
) -> Result<Vec<RepoResult<T>>, RolloutError>
where
    T: Send + 'static,
    F: Fn(Box<dyn Project>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, RolloutError>> + Send + 'static,
{
    let repos = finder.find_repos(ctx).await?;
    tracing::debug!(
        correlation_id = %ctx.correlation_id,
        repos = repos.len(),
        "fanning out"
    );

    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let action = Arc::new(action);
    let mut handles = Vec::with_capacity(repos.len());
    for repo in repos {
        let semaphore = Arc::clone(&semaphore);
        let loader = Arc::clone(&loader);
        let action = Arc::clone(&action);
        let handle = tokio::spawn(load_and_run(
            semaphore,
            loader,
            ctx.credentials.clone(),
            repo.clone(),
            action,
        ));
        handles.push((repo, handle));
    }

    let mut results = Vec::with_capacity(handles.len());
    for (repo, handle) in handles {
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(RolloutError::TaskFailed(e.to_string())),
        };
        if let Err(err) = &result {
            if err.is_programming_error() {
                tracing::error!(repo = %repo, error = %err, "action failed on repository");
            } else {
                tracing::warn!(repo = %repo, error = %err, "action failed on repository");
            }
        }
        results.push(RepoResult { repo, result });
    }
    Ok(results)
}

async fn load_and_run<T, F, Fut>(
    semaphore: Arc<Semaphore>,
    loader: Arc<dyn ProjectLoader>,
    credentials: Credentials,
    repo: RepoRef,
    action: Arc<F>,
) -> Result<T, RolloutError>
where
    F: Fn(Box<dyn Project>) -> Fut,
    Fut: Future<Output = Result<T, RolloutError>>,
{
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| RolloutError::TaskFailed(e.to_string()))?;
    let project = loader.load(&credentials, &repo, LoadMode::ReadOnly).await?;
    action(project).await
}

/// What the rollout did for one repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepoOutcome {
    /// Repository lags the ideal and was invited to converge
    Invited(Invitation),
    /// Repository is at or beyond the ideal
    UpToDate,
    /// Feature absent from the repository
    Absent,
}

/// Summary of one fan-out
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FanOutReport {
    /// Feature rolled out
    pub feature: String,
    /// Target fingerprint
    pub target: Fingerprint,
    /// Repositories attempted
    pub scanned: usize,
    /// Repositories invited to converge
    pub invited: Vec<RepoRef>,
    /// Repositories already at or beyond the target
    pub up_to_date: Vec<RepoRef>,
    /// Repositories without the feature
    pub absent: Vec<RepoRef>,
    /// Repositories that failed, with the failure message
    pub failed: Vec<(RepoRef, String)>,
}

impl FanOutReport {
    /// Empty report for `target`
    #[inline]
    #[must_use]
    pub fn new(feature: impl Into<String>, target: Fingerprint) -> Self {
        Self {
            feature: feature.into(),
            target,
            scanned: 0,
            invited: Vec::new(),
            up_to_date: Vec::new(),
            absent: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// Fold one repository result into the report
    pub fn record(&mut self, result: RepoResult<RepoOutcome>) {
        self.scanned += 1;
        match result.result {
            Ok(RepoOutcome::Invited(_)) => self.invited.push(result.repo),
            Ok(RepoOutcome::UpToDate) => self.up_to_date.push(result.repo),
            Ok(RepoOutcome::Absent) => self.absent.push(result.repo),
            Err(e) => self.failed.push((result.repo, e.to_string())),
        }
    }

    /// Whether every repository was handled
    #[inline]
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fp() -> Fingerprint {
        Fingerprint::new("runtime", "rt", "0.1.0", json!("2.0"))
    }

    #[test]
    fn report_counts_each_result() {
        let mut report = FanOutReport::new("runtime", fp());
        report.record(RepoResult {
            repo: RepoRef::new("acme", "a"),
            result: Ok(RepoOutcome::UpToDate),
        });
        report.record(RepoResult {
            repo: RepoRef::new("acme", "b"),
            result: Ok(RepoOutcome::Absent),
        });
        report.record(RepoResult {
            repo: RepoRef::new("acme", "c"),
            result: Err(RolloutError::TaskFailed("boom".to_string())),
        });
        assert_eq!(report.scanned, 3);
        assert_eq!(report.up_to_date, vec![RepoRef::new("acme", "a")]);
        assert_eq!(report.absent, vec![RepoRef::new("acme", "b")]);
        assert_eq!(report.failed.len(), 1);
        assert!(!report.is_clean());
    }
}

use cascade_core::{
    do_with_repos, Credentials, LoadMode, ProjectLoader, RepoFinder, RolloutContext, RolloutError,
};
use cascade_feature::{Project, ProjectError, RepoRef};
use cascade_test_utils::{project_at, repo, InMemoryFleet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Loader that records how many loads overlap
#[derive(Debug, Default)]
struct SlowLoader {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[async_trait::async_trait]
impl ProjectLoader for SlowLoader {
    async fn load(
        &self,
        _credentials: &Credentials,
        repo: &RepoRef,
        _mode: LoadMode,
    ) -> Result<Box<dyn Project>, ProjectError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(Box::new(project_at(&repo.name, Some("1.0"))))
    }
}

#[derive(Debug)]
struct BrokenFinder;

#[async_trait::async_trait]
impl RepoFinder for BrokenFinder {
    async fn find_repos(&self, _ctx: &RolloutContext) -> Result<Vec<RepoRef>, RolloutError> {
        Err(RolloutError::RepoFinder("forge unavailable".to_string()))
    }
}

#[tokio::test]
async fn loads_are_bounded() {
    let names: Vec<String> = (0..8).map(|i| format!("r{i}")).collect();
    let versions: Vec<(&str, Option<&str>)> = names.iter().map(|n| (n.as_str(), Some("1.0"))).collect();
    let fleet = InMemoryFleet::with_versions(&versions);
    let loader = Arc::new(SlowLoader::default());

    let results = do_with_repos(
        &fleet,
        loader.clone(),
        &RolloutContext::default(),
        3,
        |project| async move { Ok(project.id().clone()) },
    )
    .await
    .unwrap();

    assert_eq!(results.len(), 8);
    assert!(loader.peak.load(Ordering::SeqCst) <= 3);
    let seen: Vec<RepoRef> = results.into_iter().map(|r| r.result.unwrap()).collect();
    let expected: Vec<RepoRef> = names.iter().map(|n| repo(n)).collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn action_errors_stay_per_repository() {
    let fleet = Arc::new(InMemoryFleet::with_versions(&[
        ("ok", Some("1.0")),
        ("bad", Some("1.0")),
    ]));

    let results = do_with_repos(
        fleet.as_ref(),
        fleet.clone(),
        &RolloutContext::default(),
        4,
        |project| async move {
            if project.id().name == "bad" {
                Err(RolloutError::Sink("nope".to_string()))
            } else {
                Ok(())
            }
        },
    )
    .await
    .unwrap();

    assert!(results[0].result.is_ok());
    assert!(matches!(results[1].result, Err(RolloutError::Sink(_))));
}

#[tokio::test]
async fn finder_failure_propagates() {
    let fleet = Arc::new(InMemoryFleet::new());
    let err = do_with_repos(
        &BrokenFinder,
        fleet,
        &RolloutContext::default(),
        1,
        |_project| async move { Ok(()) },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RolloutError::RepoFinder(_)));
}

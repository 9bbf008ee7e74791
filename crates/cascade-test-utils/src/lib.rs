//! Testing utilities for the cascade workspace
//!
//! In-memory projects and fleets, recording sinks and observers, and a
//! feature fixture that fingerprints a `VERSION` file.

#![allow(missing_docs)]

use cascade_core::{
    Credentials, Invitation, InvitationSink, LoadMode, MemoryFleet, PossibleNewIdeal,
    PossibleNewIdealListener, ProjectLoader, RepoFinder, RolloutContext, RolloutError,
};
use cascade_feature::{
    compare_dotted_versions, ComparisonPolicy, Feature, FeatureDefinition, FeatureError,
    Fingerprint, MemoryProject, Project, ProjectError, ProjectTransform, RepoRef, WriteFile,
};
use dashmap::DashSet;
use parking_lot::Mutex;
use std::sync::Arc;

pub const VERSION_FILE: &str = "VERSION";
pub const OWNER: &str = "acme";

// ---------------------------------------------------------------------------
// Projects
// ---------------------------------------------------------------------------

pub fn repo(name: &str) -> RepoRef {
    RepoRef::new(OWNER, name)
}

/// Project with a `VERSION` file, or without one for `None`
pub fn project_at(name: &str, version: Option<&str>) -> MemoryProject {
    let project = MemoryProject::new(repo(name));
    match version {
        Some(v) => project.with_file(VERSION_FILE, format!("{v}\n")),
        None => project,
    }
}

// ---------------------------------------------------------------------------
// Fleet
// ---------------------------------------------------------------------------

/// [`MemoryFleet`] with injectable load failures and crashes
#[derive(Debug, Default)]
pub struct InMemoryFleet {
    inner: MemoryFleet,
    panicking: DashSet<RepoRef>,
}

impl InMemoryFleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fleet of `VERSION`-file repositories
    pub fn with_versions(repos: &[(&str, Option<&str>)]) -> Self {
        let fleet = Self::new();
        for (name, version) in repos {
            fleet.add(project_at(name, *version));
        }
        fleet
    }

    pub fn add(&self, project: MemoryProject) {
        self.inner.add(project);
    }

    /// Loads of `repo` fail with a load error
    pub fn fail_on(&self, repo: RepoRef) {
        self.inner.mark_unreachable(repo);
    }

    /// Loads of `repo` panic
    pub fn panic_on(&self, repo: RepoRef) {
        self.panicking.insert(repo);
    }

    pub fn file(&self, repo: &RepoRef, path: &str) -> Option<String> {
        self.inner.file(repo, path)
    }

    pub fn set_file(&self, repo: &RepoRef, path: &str, content: &str) {
        self.inner.set_file(repo, path, content);
    }

    pub fn project(&self, repo: &RepoRef) -> Option<MemoryProject> {
        self.inner.project(repo)
    }

    pub fn load_count(&self) -> usize {
        self.inner.load_count()
    }

    pub fn commit_count(&self) -> usize {
        self.inner.commit_count()
    }
}

#[async_trait::async_trait]
impl RepoFinder for InMemoryFleet {
    async fn find_repos(&self, ctx: &RolloutContext) -> Result<Vec<RepoRef>, RolloutError> {
        self.inner.find_repos(ctx).await
    }
}

#[async_trait::async_trait]
impl ProjectLoader for InMemoryFleet {
    async fn load(
        &self,
        credentials: &Credentials,
        repo: &RepoRef,
        mode: LoadMode,
    ) -> Result<Box<dyn Project>, ProjectError> {
        if self.panicking.contains(repo) {
            panic!("simulated loader crash for {repo}");
        }
        self.inner.load(credentials, repo, mode).await
    }

    async fn commit(
        &self,
        credentials: &Credentials,
        project: Box<dyn Project>,
    ) -> Result<(), ProjectError> {
        self.inner.commit(credentials, project).await
    }
}

// ---------------------------------------------------------------------------
// Sinks and observers
// ---------------------------------------------------------------------------

/// Sink that remembers every delivered invitation
#[derive(Debug, Default)]
pub struct RecordingSink {
    delivered: Mutex<Vec<Invitation>>,
    failing: DashSet<RepoRef>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliveries addressed to `repo` fail
    pub fn fail_for(&self, repo: RepoRef) {
        self.failing.insert(repo);
    }

    pub fn invitations(&self) -> Vec<Invitation> {
        self.delivered.lock().clone()
    }

    pub fn addressed_to(&self) -> Vec<RepoRef> {
        let mut repos: Vec<RepoRef> = self
            .delivered
            .lock()
            .iter()
            .map(|i| i.addressed_to.clone())
            .collect();
        repos.sort();
        repos
    }

    pub fn clear(&self) {
        self.delivered.lock().clear();
    }
}

#[async_trait::async_trait]
impl InvitationSink for RecordingSink {
    async fn deliver(&self, invitation: Invitation) -> Result<(), RolloutError> {
        if self.failing.contains(&invitation.addressed_to) {
            return Err(RolloutError::Sink(format!(
                "channel for {} unavailable",
                invitation.addressed_to
            )));
        }
        self.delivered.lock().push(invitation);
        Ok(())
    }
}

/// Observer that remembers every proposal
#[derive(Debug, Default)]
pub struct RecordingListener {
    seen: Mutex<Vec<PossibleNewIdeal>>,
    fail: bool,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records, then fails every call
    pub fn failing() -> Self {
        Self {
            seen: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn proposals(&self) -> Vec<PossibleNewIdeal> {
        self.seen.lock().clone()
    }
}

#[async_trait::async_trait]
impl PossibleNewIdealListener for RecordingListener {
    async fn on_possible_new_ideal(&self, proposal: &PossibleNewIdeal) -> Result<(), RolloutError> {
        self.seen.lock().push(proposal.clone());
        if self.fail {
            return Err(RolloutError::Listener("recording listener told to fail".to_string()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Feature fixtures
// ---------------------------------------------------------------------------

pub fn version_fp(feature: &str, version: &str) -> Fingerprint {
    Fingerprint::new(feature, "ver", "0.1.0", serde_json::Value::String(version.to_string()))
}

fn version_of(fp: &Fingerprint) -> &str {
    fp.data().as_str().unwrap_or_default()
}

/// Transform writing `version` to the `VERSION` file
pub fn set_version(version: &str) -> Arc<dyn ProjectTransform> {
    Arc::new(WriteFile::new(VERSION_FILE, format!("{version}\n")))
}

fn version_definition(name: &str) -> cascade_feature::FeatureDefinitionBuilder {
    let feature = name.to_string();
    FeatureDefinition::builder(name, "0.1.0", move |p: &dyn Project| {
        Ok(p.file(VERSION_FILE)
            .map(|v| version_fp(&feature, v.trim())))
    })
    .expect("fixture feature name is valid")
    .summarize_with(|fp| version_of(fp).to_string())
    .converge_with(|target| set_version(version_of(target)))
}

/// Convergent feature ordered by dotted version under `quality`
pub fn version_feature(name: &str) -> Arc<dyn Feature> {
    Arc::new(
        version_definition(name)
            .compare_by(ComparisonPolicy::Quality, |a, b| {
                compare_dotted_versions(version_of(a), version_of(b))
            })
            .build(),
    )
}

/// Convergent feature that only supports `size`
pub fn size_only_feature(name: &str) -> Arc<dyn Feature> {
    Arc::new(
        version_definition(name)
            .compare_by(ComparisonPolicy::Size, |a, b| {
                version_of(a).len().cmp(&version_of(b).len())
            })
            .build(),
    )
}

/// Version feature whose presence test always passes
pub fn always_present_feature(name: &str) -> Arc<dyn Feature> {
    Arc::new(
        version_definition(name)
            .present_when(|_| true)
            .compare_by(ComparisonPolicy::Quality, |a, b| {
                compare_dotted_versions(version_of(a), version_of(b))
            })
            .build(),
    )
}

/// Convergent feature whose fingerprinter always fails
pub fn failing_feature(name: &str) -> Arc<dyn Feature> {
    let feature = name.to_string();
    Arc::new(
        FeatureDefinition::builder(name, "0.1.0", move |_p: &dyn Project| {
            Err(FeatureError::fingerprint(feature.as_str(), "manifest unparsable"))
        })
        .expect("fixture feature name is valid")
        .compare_by(ComparisonPolicy::Quality, |a, b| {
            compare_dotted_versions(version_of(a), version_of(b))
        })
        .converge_with(|target| set_version(version_of(target)))
        .build(),
    )
}

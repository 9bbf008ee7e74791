//! In-memory fleet
//!
//! A [`RepoFinder`] and [`ProjectLoader`] over file maps held in memory.
//! Repositories are returned in insertion order; committed projects replace
//! the stored content. Repositories can be marked unreachable so their loads
//! fail the way a failed clone would.

use crate::collaborators::{Credentials, LoadMode, ProjectLoader, RepoFinder, RolloutContext};
use crate::error::RolloutError;
use cascade_feature::{MemoryProject, Project, ProjectError, RepoRef};
use dashmap::{DashMap, DashSet};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fleet of in-memory repositories
#[derive(Debug, Default)]
pub struct MemoryFleet {
    order: RwLock<Vec<RepoRef>>,
    files: DashMap<RepoRef, BTreeMap<String, String>>,
    unreachable: DashSet<RepoRef>,
    loads: AtomicUsize,
    commits: AtomicUsize,
}

impl MemoryFleet {
    /// Empty fleet
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a repository; new repositories go last
    pub fn add(&self, project: MemoryProject) {
        let id = project.id().clone();
        if self.files.insert(id.clone(), project.into_files()).is_none() {
            self.order.write().push(id);
        }
    }

    /// Loads of `repo` fail from now on
    pub fn mark_unreachable(&self, repo: RepoRef) {
        self.unreachable.insert(repo);
    }

    /// Repositories in finder order
    #[must_use]
    pub fn repos(&self) -> Vec<RepoRef> {
        self.order.read().clone()
    }

    /// Stored content of one file
    #[must_use]
    pub fn file(&self, repo: &RepoRef, path: &str) -> Option<String> {
        self.files.get(repo).and_then(|files| files.value().get(path).cloned())
    }

    /// Overwrite one file of a known repository
    pub fn set_file(&self, repo: &RepoRef, path: &str, content: &str) {
        if let Some(mut files) = self.files.get_mut(repo) {
            files.insert(path.to_string(), content.to_string());
        }
    }

    /// Writable snapshot of a repository
    #[must_use]
    pub fn project(&self, repo: &RepoRef) -> Option<MemoryProject> {
        self.files
            .get(repo)
            .map(|files| MemoryProject::from_files(repo.clone(), files.value().clone()))
    }

    /// Load attempts so far
    #[inline]
    #[must_use]
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Successful commits so far
    #[inline]
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RepoFinder for MemoryFleet {
    async fn find_repos(&self, _ctx: &RolloutContext) -> Result<Vec<RepoRef>, RolloutError> {
        Ok(self.repos())
    }
}

#[async_trait::async_trait]
impl ProjectLoader for MemoryFleet {
    async fn load(
        &self,
        _credentials: &Credentials,
        repo: &RepoRef,
        mode: LoadMode,
    ) -> Result<Box<dyn Project>, ProjectError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.unreachable.contains(repo) {
            return Err(ProjectError::Load {
                repo: repo.to_string(),
                reason: "repository unreachable".to_string(),
            });
        }
        let project = self
            .project(repo)
            .ok_or_else(|| ProjectError::NotFound(repo.to_string()))?;
        let project: Box<dyn Project> = match mode {
            LoadMode::ReadOnly => Box::new(project.read_only()),
            LoadMode::Writable => Box::new(project),
        };
        Ok(project)
    }

    async fn commit(
        &self,
        _credentials: &Credentials,
        project: Box<dyn Project>,
    ) -> Result<(), ProjectError> {
        if project.is_read_only() {
            return Err(ProjectError::ReadOnly(project.id().to_string()));
        }
        let files = project
            .file_paths()
            .into_iter()
            .filter_map(|path| project.file(&path).map(|content| (path, content)))
            .collect();
        tracing::debug!(repo = %project.id(), "committed project");
        self.files.insert(project.id().clone(), files);
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fleet() -> MemoryFleet {
        let fleet = MemoryFleet::new();
        fleet.add(MemoryProject::new(RepoRef::new("acme", "api")).with_file("VERSION", "1.0\n"));
        fleet.add(MemoryProject::new(RepoRef::new("acme", "web")));
        fleet
    }

    #[tokio::test]
    async fn read_only_loads_cannot_commit() {
        let fleet = fleet();
        let creds = Credentials::default();
        let api = RepoRef::new("acme", "api");

        let project = fleet.load(&creds, &api, LoadMode::ReadOnly).await.unwrap();
        assert!(project.is_read_only());
        assert!(matches!(
            fleet.commit(&creds, project).await,
            Err(ProjectError::ReadOnly(_))
        ));

        let mut project = fleet.load(&creds, &api, LoadMode::Writable).await.unwrap();
        project.write_file("VERSION", "2.0\n").unwrap();
        fleet.commit(&creds, project).await.unwrap();
        assert_eq!(fleet.file(&api, "VERSION").as_deref(), Some("2.0\n"));
        assert_eq!(fleet.load_count(), 2);
        assert_eq!(fleet.commit_count(), 1);
    }

    #[tokio::test]
    async fn unreachable_and_unknown_repositories_fail() {
        let fleet = fleet();
        let creds = Credentials::default();
        fleet.mark_unreachable(RepoRef::new("acme", "web"));

        assert!(matches!(
            fleet.load(&creds, &RepoRef::new("acme", "web"), LoadMode::ReadOnly).await,
            Err(ProjectError::Load { .. })
        ));
        assert!(matches!(
            fleet.load(&creds, &RepoRef::new("acme", "nope"), LoadMode::ReadOnly).await,
            Err(ProjectError::NotFound(_))
        ));
    }

    #[test]
    fn re_adding_keeps_order() {
        let fleet = fleet();
        fleet.add(MemoryProject::new(RepoRef::new("acme", "api")));
        assert_eq!(
            fleet.repos(),
            vec![RepoRef::new("acme", "api"), RepoRef::new("acme", "web")]
        );
        assert_eq!(fleet.file(&RepoRef::new("acme", "api"), "VERSION"), None);
    }
}

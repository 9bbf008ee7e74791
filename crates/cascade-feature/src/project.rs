//! Repository references, project content and transforms
//!
//! These are the seams to the content-inspection side of the system: the
//! convergence engine never parses files itself, it only hands a
//! [`Project`] to a feature's fingerprinter or to a [`ProjectTransform`].

use crate::error::{FeatureError, ProjectError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Address of a repository in the fleet
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoRef {
    /// Owning organization or user
    pub owner: String,
    /// Repository name
    pub name: String,
    /// Branch, when not the default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

impl RepoRef {
    /// Reference to the default branch
    #[inline]
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            branch: None,
        }
    }

    /// With explicit branch
    #[inline]
    #[must_use]
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)?;
        if let Some(branch) = &self.branch {
            write!(f, "@{branch}")?;
        }
        Ok(())
    }
}

/// Checked-out repository content
pub trait Project: Send + Sync + fmt::Debug {
    /// Repository this content was loaded from
    fn id(&self) -> &RepoRef;

    /// Whether writes are refused
    fn is_read_only(&self) -> bool;

    /// Content of the file at `path`, if present
    fn file(&self, path: &str) -> Option<String>;

    /// All file paths, sorted
    fn file_paths(&self) -> Vec<String>;

    /// Replace or create the file at `path`
    ///
    /// # Errors
    /// [`ProjectError::ReadOnly`] on read-only checkouts
    fn write_file(&mut self, path: &str, content: &str) -> Result<(), ProjectError>;

    /// Delete the file at `path`, returning whether it existed
    ///
    /// # Errors
    /// [`ProjectError::ReadOnly`] on read-only checkouts
    fn remove_file(&mut self, path: &str) -> Result<bool, ProjectError>;
}

/// Project held entirely in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryProject {
    id: RepoRef,
    read_only: bool,
    files: BTreeMap<String, String>,
}

impl MemoryProject {
    /// Empty writable project
    #[inline]
    #[must_use]
    pub fn new(id: RepoRef) -> Self {
        Self::from_files(id, BTreeMap::new())
    }

    /// Writable project over existing content
    #[inline]
    #[must_use]
    pub fn from_files(id: RepoRef, files: BTreeMap<String, String>) -> Self {
        Self {
            id,
            read_only: false,
            files,
        }
    }

    /// With a file
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(path.into(), content.into());
        self
    }

    /// Refuse writes
    #[inline]
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    /// File content by path
    #[inline]
    #[must_use]
    pub fn files(&self) -> &BTreeMap<String, String> {
        &self.files
    }

    /// Consume into file content
    #[inline]
    #[must_use]
    pub fn into_files(self) -> BTreeMap<String, String> {
        self.files
    }

    fn check_writable(&self) -> Result<(), ProjectError> {
        if self.read_only {
            return Err(ProjectError::ReadOnly(self.id.to_string()));
        }
        Ok(())
    }
}

impl Project for MemoryProject {
    fn id(&self) -> &RepoRef {
        &self.id
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn file(&self, path: &str) -> Option<String> {
        self.files.get(path).cloned()
    }

    fn file_paths(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }

    fn write_file(&mut self, path: &str, content: &str) -> Result<(), ProjectError> {
        self.check_writable()?;
        self.files.insert(path.to_string(), content.to_string());
        Ok(())
    }

    fn remove_file(&mut self, path: &str) -> Result<bool, ProjectError> {
        self.check_writable()?;
        Ok(self.files.remove(path).is_some())
    }
}

/// Outcome of applying a transform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformReport {
    /// Whether the project content changed
    pub edited: bool,
    /// Paths written
    pub files_changed: Vec<String>,
}

impl TransformReport {
    /// Nothing to do
    #[inline]
    #[must_use]
    pub fn unchanged() -> Self {
        Self::default()
    }

    /// Content changed at the given paths
    #[inline]
    #[must_use]
    pub fn edited(files_changed: Vec<String>) -> Self {
        Self {
            edited: !files_changed.is_empty(),
            files_changed,
        }
    }
}

/// Edit applied to a writable project.
///
/// Convergence transforms must be idempotent: applying one to a project
/// already at the target value reports no edit.
#[async_trait::async_trait]
pub trait ProjectTransform: Send + Sync + fmt::Debug {
    /// Apply this transform
    async fn apply(&self, project: &mut dyn Project) -> Result<TransformReport, FeatureError>;
}

/// Sets one file to fixed content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFile {
    path: String,
    content: String,
}

impl WriteFile {
    /// Transform writing `content` to `path`
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }
}

#[async_trait::async_trait]
impl ProjectTransform for WriteFile {
    async fn apply(&self, project: &mut dyn Project) -> Result<TransformReport, FeatureError> {
        if project.file(&self.path).as_deref() == Some(self.content.as_str()) {
            return Ok(TransformReport::unchanged());
        }
        project.write_file(&self.path, &self.content)?;
        Ok(TransformReport::edited(vec![self.path.clone()]))
    }
}

/// Deletes one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveFile {
    path: String,
}

impl RemoveFile {
    /// Transform deleting `path`
    #[inline]
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl ProjectTransform for RemoveFile {
    async fn apply(&self, project: &mut dyn Project) -> Result<TransformReport, FeatureError> {
        if project.remove_file(&self.path)? {
            Ok(TransformReport::edited(vec![self.path.clone()]))
        } else {
            Ok(TransformReport::unchanged())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_ref_display() {
        assert_eq!(RepoRef::new("acme", "api").to_string(), "acme/api");
        assert_eq!(
            RepoRef::new("acme", "api").with_branch("dev").to_string(),
            "acme/api@dev"
        );
    }

    #[test]
    fn report_edited_flag_follows_files() {
        assert!(!TransformReport::edited(vec![]).edited);
        assert!(TransformReport::edited(vec!["VERSION".to_string()]).edited);
    }

    #[test]
    fn read_only_project_refuses_writes() {
        let mut project = MemoryProject::new(RepoRef::new("acme", "api"))
            .with_file("VERSION", "1.0\n")
            .read_only();
        assert!(matches!(
            project.write_file("VERSION", "2.0\n"),
            Err(ProjectError::ReadOnly(_))
        ));
        assert!(project.remove_file("VERSION").is_err());
        assert_eq!(project.file("VERSION").as_deref(), Some("1.0\n"));
    }

    #[tokio::test]
    async fn write_file_is_idempotent() {
        let mut project = MemoryProject::new(RepoRef::new("acme", "api"));
        let transform = WriteFile::new("VERSION", "2.0\n");

        let first = transform.apply(&mut project).await.unwrap();
        assert_eq!(first.files_changed, vec!["VERSION".to_string()]);
        let second = transform.apply(&mut project).await.unwrap();
        assert!(!second.edited);
    }

    #[tokio::test]
    async fn remove_file_reports_only_real_deletions() {
        let mut project = MemoryProject::new(RepoRef::new("acme", "api")).with_file("VERSION", "1.0\n");
        let transform = RemoveFile::new("VERSION");

        assert!(transform.apply(&mut project).await.unwrap().edited);
        assert_eq!(project.file_paths(), Vec::<String>::new());
        assert!(!transform.apply(&mut project).await.unwrap().edited);
    }
}

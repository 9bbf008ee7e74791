//! External collaborators
//!
//! The engine does not know how repositories are enumerated, checked out or
//! how messages reach people. These traits are the seams; adapters for a
//! particular forge or chat surface implement them.

use crate::error::RolloutError;
use crate::invitation::Invitation;
use cascade_feature::{Project, ProjectError, RepoRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// Credentials passed through to the project loader
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Access token, if the loader needs one
    pub token: Option<String>,
}

impl Credentials {
    /// Token credentials
    #[inline]
    #[must_use]
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Per-invocation context threaded through pushes, approvals and fan-outs
#[derive(Debug, Clone)]
pub struct RolloutContext {
    /// Correlates log lines of one invocation
    pub correlation_id: Ulid,
    /// Credentials for the project loader
    pub credentials: Credentials,
}

impl RolloutContext {
    /// New context with a fresh correlation id
    #[inline]
    #[must_use]
    pub fn new(credentials: Credentials) -> Self {
        Self {
            correlation_id: Ulid::new(),
            credentials,
        }
    }
}

impl Default for RolloutContext {
    fn default() -> Self {
        Self::new(Credentials::default())
    }
}

/// How a project is checked out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadMode {
    /// Shared, no lock, writes refused
    ReadOnly,
    /// Exclusive at the loader level
    Writable,
}

/// Resolves the fleet of accessible repositories
#[async_trait::async_trait]
pub trait RepoFinder: Send + Sync + fmt::Debug {
    /// All repositories visible in this context
    async fn find_repos(&self, ctx: &RolloutContext) -> Result<Vec<RepoRef>, RolloutError>;
}

/// Checks projects out
#[async_trait::async_trait]
pub trait ProjectLoader: Send + Sync + fmt::Debug {
    /// Load one repository. Failures are per call.
    async fn load(
        &self,
        credentials: &Credentials,
        repo: &RepoRef,
        mode: LoadMode,
    ) -> Result<Box<dyn Project>, ProjectError>;

    /// Persist a writable project after a transform
    async fn commit(
        &self,
        _credentials: &Credentials,
        _project: Box<dyn Project>,
    ) -> Result<(), ProjectError> {
        Ok(())
    }
}

/// Delivers invitations to whatever surface people use
#[async_trait::async_trait]
pub trait InvitationSink: Send + Sync + fmt::Debug {
    /// Deliver one invitation
    async fn deliver(&self, invitation: Invitation) -> Result<(), RolloutError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_redacts_token() {
        let rendered = format!("{:?}", Credentials::token("s3cr3t"));
        assert!(!rendered.contains("s3cr3t"));
        assert!(rendered.contains("redacted"));
    }

    #[test]
    fn contexts_get_distinct_ids() {
        let a = RolloutContext::default();
        let b = RolloutContext::default();
        assert_ne!(a.correlation_id, b.correlation_id);
    }
}

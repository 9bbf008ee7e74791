//! Possible-new-ideal observers
//!
//! Invoked when a push reveals a value strictly better than the current
//! ideal. Observers present the proposal for approval; they are notified
//! concurrently and must not rely on each other's ordering.

use crate::collaborators::{InvitationSink, RolloutContext};
use crate::error::RolloutError;
use crate::invitation::Invitation;
use cascade_feature::{Feature, Fingerprint, RepoRef};
use cascade_store::StorageKey;
use std::fmt;
use std::sync::Arc;

/// Everything an approver needs to decide on a proposal
#[derive(Debug, Clone)]
pub struct PossibleNewIdeal {
    /// Feature concerned
    pub feature: Arc<dyn Feature>,
    /// Value seen in the pushed repository
    pub candidate: Fingerprint,
    /// Current ideal it beats
    pub ideal: Fingerprint,
    /// Key of the stored candidate
    pub storage_key: StorageKey,
    /// Command that approves this key
    pub rollout_command: String,
    /// Repository the push came from
    pub repo: RepoRef,
    /// Push context
    pub context: RolloutContext,
}

/// Observer of better-than-ideal candidates
#[async_trait::async_trait]
pub trait PossibleNewIdealListener: Send + Sync + fmt::Debug {
    /// React to a proposal
    async fn on_possible_new_ideal(&self, proposal: &PossibleNewIdeal) -> Result<(), RolloutError>;
}

/// Delivers an approval invitation to the pushing repository's channels
#[derive(Debug, Clone)]
pub struct InvitingListener {
    sink: Arc<dyn InvitationSink>,
}

impl InvitingListener {
    /// Create listener delivering through `sink`
    #[inline]
    #[must_use]
    pub fn new(sink: Arc<dyn InvitationSink>) -> Self {
        Self { sink }
    }
}

#[async_trait::async_trait]
impl PossibleNewIdealListener for InvitingListener {
    async fn on_possible_new_ideal(&self, proposal: &PossibleNewIdeal) -> Result<(), RolloutError> {
        tracing::info!(
            feature = proposal.feature.name(),
            candidate = %proposal.feature.summary(&proposal.candidate),
            ideal = %proposal.feature.summary(&proposal.ideal),
            key = %proposal.storage_key,
            "better than ideal value found"
        );
        let invitation = Invitation::new_ideal(
            proposal.feature.as_ref(),
            &proposal.candidate,
            &proposal.ideal,
            &proposal.storage_key,
            &proposal.rollout_command,
            proposal.repo.clone(),
        );
        self.sink.deliver(invitation).await
    }
}

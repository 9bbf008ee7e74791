//! Per-feature store of the current ideal fingerprint
//!
//! One ideal per feature name, no history. `set_ideal` overwrites
//! unconditionally; concurrent writers race and the last one wins.

use crate::error::StoreError;
use cascade_feature::Fingerprint;
use dashmap::DashMap;
use std::fmt;

/// Holds the team-wide target value of each feature
#[async_trait::async_trait]
pub trait IdealStore: Send + Sync + fmt::Debug {
    /// Current ideal, absent for unknown or never-set features
    async fn ideal(&self, feature_name: &str) -> Result<Option<Fingerprint>, StoreError>;

    /// Replace the ideal of the fingerprint's own feature
    async fn set_ideal(&self, fingerprint: Fingerprint) -> Result<(), StoreError>;
}

/// In-memory [`IdealStore`]
#[derive(Debug, Default)]
pub struct InMemoryIdealStore {
    ideals: DashMap<String, Fingerprint>,
}

impl InMemoryIdealStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create store seeded with initial ideals. Later entries for the same
    /// feature replace earlier ones.
    #[must_use]
    pub fn with_ideals(ideals: impl IntoIterator<Item = Fingerprint>) -> Self {
        let store = Self::new();
        for ideal in ideals {
            store.ideals.insert(ideal.name().to_string(), ideal);
        }
        store
    }

    /// Number of features with an ideal
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ideals.len()
    }

    /// Check if no ideal is set
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ideals.is_empty()
    }
}

#[async_trait::async_trait]
impl IdealStore for InMemoryIdealStore {
    async fn ideal(&self, feature_name: &str) -> Result<Option<Fingerprint>, StoreError> {
        Ok(self
            .ideals
            .get(feature_name)
            .map(|entry| entry.value().clone()))
    }

    async fn set_ideal(&self, fingerprint: Fingerprint) -> Result<(), StoreError> {
        tracing::info!(
            feature = fingerprint.name(),
            sha = fingerprint.sha(),
            "setting ideal"
        );
        self.ideals.insert(fingerprint.name().to_string(), fingerprint);
        Ok(())
    }
}

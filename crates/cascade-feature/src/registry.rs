//! Registry of features known to the process
//!
//! Populated once at startup from static configuration. Lookup by name;
//! iteration in registration order.

use crate::error::FeatureError;
use crate::feature::Feature;
use std::collections::HashMap;
use std::sync::Arc;

/// Registered features, unique by name
#[derive(Debug, Default, Clone)]
pub struct FeatureRegistry {
    features: Vec<Arc<dyn Feature>>,
    by_name: HashMap<String, usize>,
}

impl FeatureRegistry {
    /// Create empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a feature
    ///
    /// # Errors
    /// - [`FeatureError::InvalidName`] for a blank name
    /// - [`FeatureError::DuplicateFeature`] if the name is taken
    pub fn register(&mut self, feature: Arc<dyn Feature>) -> Result<(), FeatureError> {
        let name = feature.name().to_string();
        if name.trim().is_empty() {
            return Err(FeatureError::InvalidName(name));
        }
        if self.by_name.contains_key(&name) {
            return Err(FeatureError::DuplicateFeature(name));
        }
        tracing::debug!(feature = %name, version = feature.version(), "registered feature");
        self.by_name.insert(name, self.features.len());
        self.features.push(feature);
        Ok(())
    }

    /// Builder-style [`FeatureRegistry::register`]
    ///
    /// # Errors
    /// See [`FeatureRegistry::register`]
    pub fn with(mut self, feature: Arc<dyn Feature>) -> Result<Self, FeatureError> {
        self.register(feature)?;
        Ok(self)
    }

    /// Look up by name
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Feature>> {
        self.by_name.get(name).map(|&idx| &self.features[idx])
    }

    /// Look up by name, failing on unknown names
    ///
    /// # Errors
    /// [`FeatureError::UnknownFeature`]
    pub fn require(&self, name: &str) -> Result<&Arc<dyn Feature>, FeatureError> {
        self.get(name)
            .ok_or_else(|| FeatureError::UnknownFeature(name.to_string()))
    }

    /// Check if a feature is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Features in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Feature>> {
        self.features.iter()
    }

    /// Features that can converge a project to a target value
    pub fn convergent(&self) -> impl Iterator<Item = &Arc<dyn Feature>> {
        self.features.iter().filter(|f| f.can_converge())
    }

    /// Sorted feature names
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.features.iter().map(|f| f.name()).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered features
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Check if registry is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

//! Fingerprints: immutable snapshots of one feature in one repository
//!
//! A [`Fingerprint`] carries the feature name, a short abbreviation, the
//! schema version of the logic that produced it and an opaque JSON payload.
//! The content hash is computed once at construction and identifies the
//! payload independently of where it was observed.

use crate::error::FeatureError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Immutable snapshot of a feature's state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    name: String,
    abbreviation: String,
    version: String,
    data: serde_json::Value,
    sha: String,
}

impl Fingerprint {
    /// Create fingerprint from a raw JSON payload
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        abbreviation: impl Into<String>,
        version: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        let name = name.into();
        let abbreviation = abbreviation.into();
        let version = version.into();
        let sha = content_hash(&name, &abbreviation, &version, &data);
        Self {
            name,
            abbreviation,
            version,
            data,
            sha,
        }
    }

    /// Create fingerprint from any serializable payload
    ///
    /// # Errors
    /// Returns [`FeatureError::Payload`] if the payload cannot be represented as JSON
    pub fn from_payload<T: Serialize>(
        name: impl Into<String>,
        abbreviation: impl Into<String>,
        version: impl Into<String>,
        payload: &T,
    ) -> Result<Self, FeatureError> {
        let data = serde_json::to_value(payload)?;
        Ok(Self::new(name, abbreviation, version, data))
    }

    /// Decode the payload into a typed value
    ///
    /// # Errors
    /// Returns [`FeatureError::Payload`] if the payload does not match `T`
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T, FeatureError> {
        Ok(serde_json::from_value(self.data.clone())?)
    }

    /// Name of the feature this fingerprint belongs to
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Short abbreviation
    #[inline]
    #[must_use]
    pub fn abbreviation(&self) -> &str {
        &self.abbreviation
    }

    /// Schema version of the fingerprinting logic
    #[inline]
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Opaque payload
    #[inline]
    #[must_use]
    pub fn data(&self) -> &serde_json::Value {
        &self.data
    }

    /// Hex-encoded content hash
    #[inline]
    #[must_use]
    pub fn sha(&self) -> &str {
        &self.sha
    }

    /// Whether two fingerprints carry identical content
    #[inline]
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.sha == other.sha
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.name, self.version, self.data)
    }
}

/// blake3 over name, abbreviation, version and the canonical JSON payload.
///
/// `serde_json::Map` is ordered, so the serialized payload is canonical.
fn content_hash(name: &str, abbreviation: &str, version: &str, data: &serde_json::Value) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(name.as_bytes());
    hasher.update(&[0]);
    hasher.update(abbreviation.as_bytes());
    hasher.update(&[0]);
    hasher.update(version.as_bytes());
    hasher.update(&[0]);
    hasher.update(data.to_string().as_bytes());
    hex::encode(hasher.finalize().as_bytes())
}

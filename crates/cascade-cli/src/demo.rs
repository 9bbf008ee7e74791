//! Demo feature: the version recorded in a `VERSION` file

use cascade_core::{Invitation, InvitationSink, RolloutError};
use cascade_feature::{
    compare_dotted_versions, ComparisonPolicy, FeatureDefinition, FeatureError, Fingerprint,
    Project, ProjectTransform, RatingScale, WriteFile,
};
use parking_lot::Mutex;
use std::sync::Arc;

/// File the demo feature fingerprints
pub const VERSION_FILE: &str = "VERSION";

const ABBREVIATION: &str = "ver";
const FEATURE_VERSION: &str = "0.1.0";

/// Fingerprint of `version` for feature `name`
#[must_use]
pub fn version_fingerprint(name: &str, version: &str) -> Fingerprint {
    Fingerprint::new(
        name,
        ABBREVIATION,
        FEATURE_VERSION,
        serde_json::Value::String(version.to_string()),
    )
}

fn version_of(fp: &Fingerprint) -> &str {
    fp.data().as_str().unwrap_or_default()
}

/// Demo feature ordered by dotted version
///
/// # Errors
/// [`FeatureError::InvalidName`] for a blank name
pub fn version_feature(name: &str) -> Result<FeatureDefinition, FeatureError> {
    let feature = name.to_string();
    Ok(FeatureDefinition::builder(name, FEATURE_VERSION, move |p: &dyn Project| {
        Ok(p.file(VERSION_FILE)
            .map(|v| version_fingerprint(&feature, v.trim()))
            .filter(|fp| !version_of(fp).is_empty()))
    })?
    .relevant_when(|p| !p.file_paths().is_empty())
    .compare_by(ComparisonPolicy::Quality, |a, b| {
        compare_dotted_versions(version_of(a), version_of(b))
    })
    .rate_on(RatingScale::traffic_light(), |fp| {
        let major = version_of(fp).split('.').next().and_then(|m| m.parse::<u32>().ok());
        let level = match major {
            Some(0) | None => "red",
            Some(1) => "amber",
            Some(_) => "green",
        };
        level.to_string()
    })
    .summarize_with(|fp| version_of(fp).to_string())
    .converge_with(|target| {
        Arc::new(WriteFile::new(VERSION_FILE, format!("{}\n", version_of(target))))
            as Arc<dyn ProjectTransform>
    })
    .build())
}

/// Logs invitations and keeps them for the final report
#[derive(Debug, Default)]
pub struct CollectingSink {
    invitations: Mutex<Vec<Invitation>>,
}

impl CollectingSink {
    /// Create empty sink
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far
    #[must_use]
    pub fn invitations(&self) -> Vec<Invitation> {
        self.invitations.lock().clone()
    }
}

#[async_trait::async_trait]
impl InvitationSink for CollectingSink {
    async fn deliver(&self, invitation: Invitation) -> Result<(), RolloutError> {
        tracing::info!(
            to = %invitation.addressed_to,
            action = %invitation.action_id,
            "{}",
            invitation.text
        );
        self.invitations.lock().push(invitation);
        Ok(())
    }
}

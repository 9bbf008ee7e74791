//! Rating scales
//!
//! Unlike comparison policies, a rating scale is fixed: a fingerprint is
//! rated onto one of a finite list of levels, ordered worst to best.

use crate::error::FeatureError;
use crate::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Ordered list of named levels, worst first
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RatingScale {
    name: String,
    levels: Vec<String>,
}

impl RatingScale {
    /// Create scale from levels ordered worst to best
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, levels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            levels: levels.into_iter().map(Into::into).collect(),
        }
    }

    /// Conventional three-level traffic-light scale
    #[must_use]
    pub fn traffic_light() -> Self {
        Self::new("traffic-light", ["red", "amber", "green"])
    }

    /// Scale name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Levels, worst first
    #[inline]
    #[must_use]
    pub fn levels(&self) -> &[String] {
        &self.levels
    }

    /// Rank a level on this scale
    ///
    /// # Errors
    /// [`FeatureError::RatingOutOfScale`] if the level is not on the scale
    pub fn rating(&self, level: &str) -> Result<Rating, FeatureError> {
        let rank = self
            .levels
            .iter()
            .position(|l| l == level)
            .ok_or_else(|| FeatureError::RatingOutOfScale {
                scale: self.name.clone(),
                level: level.to_string(),
            })?;
        Ok(Rating {
            scale: self.name.clone(),
            level: level.to_string(),
            rank,
        })
    }
}

/// A fingerprint's position on a rating scale
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    /// Scale name
    pub scale: String,
    /// Level name
    pub level: String,
    /// Zero-based rank, higher is better
    pub rank: usize,
}

/// Maps a fingerprint to a level name on its scale
pub type Rater = Arc<dyn Fn(&Fingerprint) -> String + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_ranks_levels() {
        let scale = RatingScale::traffic_light();
        assert_eq!(scale.rating("red").unwrap().rank, 0);
        assert_eq!(scale.rating("green").unwrap().rank, 2);
    }

    #[test]
    fn rating_rejects_unknown_level() {
        let scale = RatingScale::traffic_light();
        assert!(matches!(
            scale.rating("blue"),
            Err(FeatureError::RatingOutOfScale { .. })
        ));
    }
}

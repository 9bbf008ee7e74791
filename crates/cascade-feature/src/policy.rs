//! Comparison policies and comparator helpers
//!
//! A comparison policy is a named three-way ordering over two fingerprints of
//! the same feature. Under every policy, `Ordering::Less` means the left
//! value is worse than the right one.

use crate::fingerprint::Fingerprint;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Named ordering rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonPolicy {
    /// Better quality wins. The only policy that can drive a rollout.
    Quality,
    /// Larger wins. No fixed scale.
    Size,
}

impl ComparisonPolicy {
    /// All known policies
    pub const ALL: [ComparisonPolicy; 2] = [Self::Quality, Self::Size];

    /// Wire name
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Quality => "quality",
            Self::Size => "size",
        }
    }
}

impl fmt::Display for ComparisonPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown policy name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown comparison policy: {0}")]
pub struct ParsePolicyError(pub String);

impl FromStr for ComparisonPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quality" => Ok(Self::Quality),
            "size" => Ok(Self::Size),
            other => Err(ParsePolicyError(other.to_string())),
        }
    }
}

/// Shared three-way comparator over fingerprints
pub type Comparator = Arc<dyn Fn(&Fingerprint, &Fingerprint) -> Ordering + Send + Sync>;

/// Make a comparator total over absent values.
///
/// An absent left side orders after any present right side (`Greater`), a
/// present left side orders before an absent right side (`Less`), and two
/// absent values are equal. Present values defer to `compare`. Sorting with
/// the result pushes repositories lacking the feature to the end of a
/// ranking, so they never win against one that has it.
pub fn absent_is_less<T, F>(compare: F) -> impl Fn(Option<&T>, Option<&T>) -> Ordering
where
    T: ?Sized,
    F: Fn(&T, &T) -> Ordering,
{
    move |a, b| match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => compare(a, b),
    }
}

/// Compare dotted version strings segment by segment.
///
/// Numeric segments compare numerically, anything else lexically; a missing
/// segment is treated as lower than a present one, so `2.1` < `2.1.0`.
#[must_use]
pub fn compare_dotted_versions(a: &str, b: &str) -> Ordering {
    let mut left = a.split(['.', '-']);
    let mut right = b.split(['.', '-']);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ord = match (l.parse::<u64>(), r.parse::<u64>()) {
                    (Ok(l), Ok(r)) => l.cmp(&r),
                    (Ok(_), Err(_)) => Ordering::Greater,
                    (Err(_), Ok(_)) => Ordering::Less,
                    (Err(_), Err(_)) => l.cmp(r),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn policy_round_trips_through_str() {
        for policy in ComparisonPolicy::ALL {
            assert_eq!(policy.as_str().parse::<ComparisonPolicy>().unwrap(), policy);
        }
        assert!("speed".parse::<ComparisonPolicy>().is_err());
    }

    #[test]
    fn policy_serializes_lowercase() {
        let json = serde_json::to_string(&ComparisonPolicy::Quality).unwrap();
        assert_eq!(json, "\"quality\"");
    }

    #[test]
    fn absent_sorts_last() {
        let cmp = absent_is_less(|a: &i32, b: &i32| a.cmp(b));
        assert_eq!(cmp(None, Some(&1)), Ordering::Greater);
        assert_eq!(cmp(Some(&1), None), Ordering::Less);
        assert_eq!(cmp(None, None), Ordering::Equal);
        assert_eq!(cmp(Some(&1), Some(&2)), Ordering::Less);
    }

    #[test]
    fn dotted_versions() {
        assert_eq!(compare_dotted_versions("2.0.5", "2.0.10"), Ordering::Less);
        assert_eq!(compare_dotted_versions("2.1.0", "2.0.99"), Ordering::Greater);
        assert_eq!(compare_dotted_versions("1.2.3", "1.2.3"), Ordering::Equal);
        assert_eq!(compare_dotted_versions("2.1", "2.1.0"), Ordering::Less);
        assert_eq!(
            compare_dotted_versions("2.0.5.RELEASE", "2.0.5.M1"),
            Ordering::Greater
        );
    }

    proptest! {
        #[test]
        fn prop_absent_is_worse_than_any_value(x in any::<i64>()) {
            let cmp = absent_is_less(|a: &i64, b: &i64| a.cmp(b));
            prop_assert_eq!(cmp(None, Some(&x)), Ordering::Greater);
            prop_assert_eq!(cmp(Some(&x), None), Ordering::Less);
        }

        #[test]
        fn prop_dotted_versions_antisymmetric(
            a in proptest::collection::vec(0u64..20, 1..4),
            b in proptest::collection::vec(0u64..20, 1..4),
        ) {
            let a = a.iter().map(u64::to_string).collect::<Vec<_>>().join(".");
            let b = b.iter().map(u64::to_string).collect::<Vec<_>>().join(".");
            prop_assert_eq!(compare_dotted_versions(&a, &b), compare_dotted_versions(&b, &a).reverse());
        }
    }
}

//! Cascade Feature Contract
//!
//! Describes a tracked dimension of repository state and the values observed
//! for it.
//!
//! # Core Concepts
//!
//! - [`Fingerprint`]: immutable, content-hashed snapshot of one feature in one repository
//! - [`ComparisonPolicy`]: named three-way ordering (`quality`, `size`)
//! - [`Feature`]: fingerprint / compare / rate / converge capability set
//! - [`FeatureDefinition`]: closure-backed feature built with a builder
//! - [`FeatureRegistry`]: process-wide set of features, unique by name
//! - [`Project`] and [`ProjectTransform`]: the content-inspection seam, with
//!   [`MemoryProject`], [`WriteFile`] and [`RemoveFile`] as in-memory building blocks
//!
//! # Example
//!
//! ```rust,ignore
//! use cascade_feature::{compare_dotted_versions, ComparisonPolicy, FeatureDefinition, Fingerprint};
//!
//! let feature = FeatureDefinition::builder("runtime", "0.1.0", |p| {
//!     Ok(p.file("VERSION")
//!         .map(|v| Fingerprint::new("runtime", "rt", "0.1.0", v.trim().into())))
//! })?
//! .compare_by(ComparisonPolicy::Quality, |a, b| {
//!     compare_dotted_versions(a.data().as_str().unwrap_or(""), b.data().as_str().unwrap_or(""))
//! })
//! .build();
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod definition;
mod error;
mod feature;
mod fingerprint;
mod policy;
mod project;
mod rating;
mod registry;

pub use definition::{
    ConvergenceFactory, FeatureDefinition, FeatureDefinitionBuilder, Fingerprinter,
    ProjectPredicate, Summarizer,
};
pub use error::{FeatureError, ProjectError};
pub use feature::Feature;
pub use fingerprint::Fingerprint;
pub use policy::{
    absent_is_less, compare_dotted_versions, Comparator, ComparisonPolicy, ParsePolicyError,
};
pub use project::{
    MemoryProject, Project, ProjectTransform, RemoveFile, RepoRef, TransformReport, WriteFile,
};
pub use rating::{Rater, Rating, RatingScale};
pub use registry::FeatureRegistry;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

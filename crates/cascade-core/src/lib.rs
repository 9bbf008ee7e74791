//! Cascade Core - feature convergence engine
//!
//! Keeps a fleet of repositories converging on a team-wide ideal value per
//! feature:
//! - Detects, on each push, values strictly better than the current ideal
//! - Stores them as proposals and notifies observers for approval
//! - On approval, sets the new ideal and fans out across the fleet
//! - Invites every lagging repository to run the convergence transform
//!
//! # Example
//!
//! ```rust,ignore
//! use cascade_core::{FeatureManager, RolloutConfig, RolloutContext};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = FeatureManager::in_memory(registry, RolloutConfig::new(), finder, loader, sink)?;
//!
//! let ctx = RolloutContext::default();
//! for (feature, outcome) in manager.on_push(project.as_ref(), &ctx).await? {
//!     match outcome {
//!         Ok(outcome) => println!("{feature}: {}", outcome.label()),
//!         Err(err) => eprintln!("{feature}: {err}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod collaborators;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod fanout;
pub mod invitation;
pub mod listener;
pub mod manager;
pub mod memory;
pub mod strategy;

pub use collaborators::{
    Credentials, InvitationSink, LoadMode, ProjectLoader, RepoFinder, RolloutContext,
};
pub use config::RolloutConfig;
pub use coordinator::{PushOutcome, RolloutCoordinator};
pub use error::RolloutError;
pub use fanout::{do_with_repos, FanOutReport, RepoOutcome, RepoResult};
pub use invitation::{
    CommandNames, Invitation, STORAGE_KEY_PARAM, TARGET_BRANCH_PARAM, TARGET_OWNER_PARAM,
    TARGET_REPO_PARAM,
};
pub use listener::{InvitingListener, PossibleNewIdeal, PossibleNewIdealListener};
pub use manager::{ActionResult, FeatureManager, FeatureManagerBuilder, TransformOutcome};
pub use memory::MemoryFleet;
pub use strategy::{InvitationRolloutStrategy, RolloutStrategy};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for wiring the engine
    pub use crate::{
        Credentials, FeatureManager, Invitation, InvitationSink, ProjectLoader, PushOutcome,
        RepoFinder, RolloutConfig, RolloutContext, RolloutError,
    };
    pub use cascade_feature::{
        ComparisonPolicy, Feature, FeatureDefinition, FeatureRegistry, Fingerprint, Project,
        RepoRef,
    };
    pub use cascade_store::StorageKey;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

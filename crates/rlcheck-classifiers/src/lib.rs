//! rlcheck Classifiers
//!
//! The contract every reputation classifier fulfils, the policy that decides
//! whether a classification is already blocked, and the HTTP client for the
//! ThreatExplorer reputation API.
//!
//! Classifiers are called concurrently from many worker threads, so every
//! implementation must be `Send + Sync` and keep no mutable state between calls.

pub mod classifier;
pub mod policy;
pub mod threat_explorer;

pub use classifier::{ClassificationResult, ClassifyError, ThreatClassifier};
pub use policy::{BlockPolicy, Category};
pub use threat_explorer::{ThreatExplorerClient, ThreatExplorerConfig};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classifier::{ClassificationResult, ClassifyError, ThreatClassifier};
    pub use crate::policy::{BlockPolicy, Category};
    pub use crate::threat_explorer::{ThreatExplorerClient, ThreatExplorerConfig};
}

//! Release bundle data model.
//!
//! This module holds the pure (I/O free) representation of a release bundle:
//! its identity, the descriptor used to create or update it, and the two
//! independent state axes observed while it is distributed.

mod descriptor;
pub mod query;
mod state;

pub use descriptor::{
    BundleDescriptor, DescriptorBuilder, DistributionRule, DistributionRulesFile, ReleaseNotes,
    ReleaseNotesSyntax, parse_properties,
};
pub use state::{
    DistributionProgress, DistributionRecord, DistributionStatus, LocalBundleState,
    RawDistributionRecord, all_records_terminal, classify_distribution_records,
    classify_local_state,
};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Immutable (name, version) key of a release bundle
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReleaseBundleIdentity {
    /// Bundle name
    pub name: String,
    /// Bundle version
    pub version: String,
}

impl ReleaseBundleIdentity {
    /// Create an identity
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl fmt::Display for ReleaseBundleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.version)
    }
}

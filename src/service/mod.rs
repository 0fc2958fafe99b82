//! Repository service abstraction.
//!
//! The lifecycle controller never talks HTTP directly. Every network
//! interaction goes through [`RepositoryService`], so the controller can be
//! driven by the real distribution API ([`HttpRepositoryService`]) or by an
//! in-memory fake in tests.

mod http;

pub use http::HttpRepositoryService;

use crate::bundle::{
    BundleDescriptor, DistributionRule, RawDistributionRecord, ReleaseBundleIdentity, ReleaseNotes,
};
use crate::error::ServiceError;
use serde::{Deserialize, Serialize};

/// Result of a repository service call
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Release bundle as reported by the local (creation-side) endpoint
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocalBundleResponse {
    /// Bundle name
    #[serde(default)]
    pub name: String,
    /// Bundle version
    #[serde(default)]
    pub version: String,
    /// Raw local state; may be absent on some service versions
    #[serde(default)]
    pub state: Option<String>,
    /// Description
    #[serde(default)]
    pub description: Option<String>,
    /// Release notes
    #[serde(default)]
    pub release_notes: Option<ReleaseNotes>,
}

/// Distribute request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionRequest {
    /// Bundle to distribute
    pub identity: ReleaseBundleIdentity,
    /// Target site filter
    pub rules: Vec<DistributionRule>,
    /// Validate only
    pub dry_run: bool,
}

/// Delete request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    /// Bundle to delete
    pub identity: ReleaseBundleIdentity,
    /// Sites the deletion applies to
    pub sites: Vec<DistributionRule>,
    /// Also purge the copies already distributed to `sites`
    pub delete_from_distribution: bool,
    /// Validate only
    pub dry_run: bool,
}

/// Operations the distribution service exposes to this client
#[async_trait::async_trait]
pub trait RepositoryService: Send + Sync {
    /// Fetch the local bundle, `None` when it does not exist
    async fn get_local_bundle(
        &self,
        identity: &ReleaseBundleIdentity,
    ) -> ServiceResult<Option<LocalBundleResponse>>;

    /// Create a bundle from a descriptor
    async fn create_bundle(&self, descriptor: &BundleDescriptor) -> ServiceResult<()>;

    /// Replace the content of an existing bundle
    async fn update_bundle(&self, descriptor: &BundleDescriptor) -> ServiceResult<()>;

    /// Sign a bundle
    async fn sign_bundle(
        &self,
        identity: &ReleaseBundleIdentity,
        storing_repository: Option<&str>,
    ) -> ServiceResult<()>;

    /// Trigger distribution to the sites matched by the request's rules
    async fn distribute_bundle(&self, request: &DistributionRequest) -> ServiceResult<()>;

    /// Per-site distribution records, `None` when the bundle is unknown to
    /// the distribution index
    async fn get_distribution_records(
        &self,
        identity: &ReleaseBundleIdentity,
    ) -> ServiceResult<Option<Vec<RawDistributionRecord>>>;

    /// Delete a bundle
    async fn delete_bundle(&self, request: &DeleteRequest) -> ServiceResult<()>;

    /// Names of every bundle known to the service
    async fn list_bundle_names(&self) -> ServiceResult<Vec<String>>;
}

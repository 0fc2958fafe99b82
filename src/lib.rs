//! # rbdist
//!
//! Client-side orchestration of release bundles on a distribution service.
//!
//! A release bundle is an immutable, versioned set of artifacts. This crate
//! drives bundles through create, sign, distribute and delete, and waits for
//! the service's asynchronous state changes with a bounded, fixed-delay
//! poller.
//!
//! ## Features
//!
//! - **Lifecycle control**: typed errors for every way an operation can fail
//! - **Bounded waits**: fixed attempt budget, optional cancellation
//! - **Two state axes**: local bundle state and per-site distribution records
//! - **Cleanup sweep**: best-effort removal of stale timestamped bundles
//!
//! ## Usage
//!
//! ```bash
//! rbdist create app 1.0.0 'libs-release/app/*.jar' --sign
//! rbdist distribute app 1.0.0 --sync --max-wait-minutes 10
//! rbdist status app 1.0.0 --json
//! rbdist cleanup cli-test --bundle-version 1.0.0
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod bundle;
pub mod cli;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod poll;
pub mod service;
pub mod sweep;

pub use bundle::{
    BundleDescriptor, DistributionRecord, DistributionRule, DistributionStatus, LocalBundleState,
    ReleaseBundleIdentity,
};
pub use config::DistributionConfig;
pub use error::{DistError, LifecycleError, Result, ServiceError, StateError};
pub use lifecycle::{
    BundleStatus, DistributionMode, DistributionOutcome, LifecycleController, LifecycleResult,
};
pub use poll::{PollOutcome, PollPolicy, Poller, Probe, poll_until};
pub use service::{HttpRepositoryService, RepositoryService};
pub use sweep::{NameMatcher, SweepReport, sweep_stale_bundles};

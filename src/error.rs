//! Error types for release bundle distribution operations.
//!
//! This module defines the typed error taxonomy surfaced by the lifecycle
//! controller, plus the CLI-facing helpers (recovery suggestions, exit codes).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rbdist operations
pub type Result<T> = std::result::Result<T, DistError>;

/// Main error type for all rbdist operations
#[derive(Error, Debug)]
pub enum DistError {
    /// Release bundle lifecycle errors
    #[error("{0}")]
    Lifecycle(#[from] LifecycleError),

    /// Unrecognized wire status values
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic errors from anyhow
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Errors returned by a repository service implementation.
///
/// These describe what the service said, not what the caller was trying to
/// do. The lifecycle controller maps them into [`LifecycleError`] per
/// operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Connection failure, timeout or 5xx response
    #[error("transport failure: {reason}")]
    Transport {
        /// Reason for the error
        reason: String,
    },

    /// The service rejected the request content
    #[error("request rejected ({status}): {message}")]
    Rejected {
        /// HTTP status code returned by the service
        status: u16,
        /// Body or message returned by the service
        message: String,
    },

    /// The targeted resource does not exist
    #[error("resource not found")]
    NotFound,

    /// Credentials were missing or refused
    #[error("authentication refused ({status})")]
    Unauthorized {
        /// HTTP status code returned by the service
        status: u16,
    },

    /// The service answered with a body we could not interpret
    #[error("invalid response: {reason}")]
    InvalidResponse {
        /// Reason for the error
        reason: String,
    },
}

/// Lifecycle controller errors
///
/// Each variant is a distinct, inspectable failure kind; the CLI layer decides
/// how to present them and which exit code to use.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Network or connection failure; never retried at this layer
    #[error("Transport error during {operation}: {reason}")]
    Transport {
        /// Operation that failed
        operation: String,
        /// Reason for the error
        reason: String,
    },

    /// Service refused to create the bundle
    #[error("Creation of release bundle {bundle} rejected: {reason}")]
    CreationRejected {
        /// Bundle identity ("name/version")
        bundle: String,
        /// Reason for the error
        reason: String,
    },

    /// Service rejected descriptor or rule content
    #[error("Request for release bundle {bundle} rejected: {reason}")]
    ValidationRejected {
        /// Bundle identity ("name/version")
        bundle: String,
        /// Reason for the error
        reason: String,
    },

    /// The bundle does not exist where existence was required
    #[error("Release bundle {bundle} not found")]
    NotFound {
        /// Bundle identity ("name/version")
        bundle: String,
    },

    /// Service could not sign the bundle
    #[error("Signing of release bundle {bundle} rejected: {reason}")]
    SigningRejected {
        /// Bundle identity ("name/version")
        bundle: String,
        /// Reason for the error
        reason: String,
    },

    /// Service refused the configured credentials
    #[error("Authentication failed during {operation} (HTTP {status})")]
    AuthenticationFailed {
        /// Operation that failed
        operation: String,
        /// HTTP status code
        status: u16,
    },

    /// Attempt budget exhausted without reaching a terminal state
    #[error("Timed out waiting for {operation} after {attempts} attempts")]
    PollTimedOut {
        /// What was being waited for
        operation: String,
        /// Number of probe invocations made
        attempts: u32,
    },

    /// Probe observed an explicit failure terminal state
    #[error("{operation} failed: {reason}")]
    PollFailed {
        /// What was being waited for
        operation: String,
        /// Failure reported by the probe
        reason: String,
    },

    /// Caller cancelled the wait before a terminal state was observed
    #[error("Waiting for {operation} cancelled after {attempts} attempts")]
    PollCancelled {
        /// What was being waited for
        operation: String,
        /// Number of probe invocations made
        attempts: u32,
    },

    /// Service reported a status string outside the known protocol
    #[error("Protocol error: {0}")]
    State(#[from] StateError),
}

/// Wire status classification errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Unknown local bundle state
    #[error("unrecognized release bundle state '{raw}'")]
    UnknownLocalState {
        /// Raw value received from the service
        raw: String,
    },

    /// Unknown per-site distribution status
    #[error("unrecognized distribution status '{raw}'")]
    UnknownDistributionStatus {
        /// Raw value received from the service
        raw: String,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No service URL configured
    #[error("Distribution URL is not configured. Set RBDIST_URL, use --url or add `url` to the config file.")]
    MissingUrl,

    /// URL could not be parsed or uses an unsupported scheme
    #[error("Invalid distribution URL '{url}': {reason}")]
    InvalidUrl {
        /// Offending URL
        url: String,
        /// Reason for the error
        reason: String,
    },

    /// Invalid polling configuration
    #[error("Invalid polling configuration: {reason}")]
    InvalidPolling {
        /// Reason for the error
        reason: String,
    },

    /// Config file could not be read
    #[error("Failed to read config file {path}: {reason}")]
    ReadFailed {
        /// Path of the config file
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },

    /// Input file could not be used
    #[error("Invalid input file {path}: {reason}")]
    InvalidInputFile {
        /// Path of the file
        path: PathBuf,
        /// Reason for the error
        reason: String,
    },
}

impl LifecycleError {
    /// Map a collaborator error into the lifecycle taxonomy for operations
    /// with no operation-specific mapping.
    pub(crate) fn from_service(operation: &str, bundle: &str, error: ServiceError) -> Self {
        match error {
            ServiceError::Transport { reason } => LifecycleError::Transport {
                operation: operation.to_string(),
                reason,
            },
            ServiceError::InvalidResponse { reason } => LifecycleError::Transport {
                operation: operation.to_string(),
                reason: format!("invalid response: {reason}"),
            },
            ServiceError::Rejected { status, message } => LifecycleError::ValidationRejected {
                bundle: bundle.to_string(),
                reason: format!("HTTP {status}: {message}"),
            },
            ServiceError::NotFound => LifecycleError::NotFound {
                bundle: bundle.to_string(),
            },
            ServiceError::Unauthorized { status } => LifecycleError::AuthenticationFailed {
                operation: operation.to_string(),
                status,
            },
        }
    }
}

impl DistError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            DistError::Config(ConfigError::MissingUrl) => vec![
                "Export RBDIST_URL=https://<host>/distribution/".to_string(),
                "Or pass --url on the command line".to_string(),
            ],
            DistError::Lifecycle(LifecycleError::AuthenticationFailed { .. }) => vec![
                "Check RBDIST_ACCESS_TOKEN or RBDIST_USER/RBDIST_PASSWORD".to_string(),
                "Verify the token has distribution permissions".to_string(),
            ],
            DistError::Lifecycle(LifecycleError::SigningRejected { .. }) => vec![
                "Ensure a GPG signing key is configured on the distribution service".to_string(),
                "Ensure the public key is trusted by the source repository".to_string(),
            ],
            DistError::Lifecycle(LifecycleError::Transport { .. }) => vec![
                "Check network connectivity to the distribution service".to_string(),
                "Verify the configured URL".to_string(),
            ],
            DistError::Lifecycle(LifecycleError::PollTimedOut { .. }) => vec![
                "Check the distribution status with `rbdist status`".to_string(),
                "Increase the wait with --max-wait-minutes or RBDIST_POLL_ATTEMPTS".to_string(),
            ],
            DistError::Lifecycle(LifecycleError::NotFound { bundle }) => vec![format!(
                "Create the release bundle first: rbdist create {}",
                bundle.replace('/', " ")
            )],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            DistError::Cli(_) | DistError::Config(_) => 2,
            DistError::Lifecycle(LifecycleError::PollTimedOut { .. }) => 3,
            DistError::Lifecycle(LifecycleError::PollFailed { .. }) => 4,
            _ => 1,
        }
    }
}

//! Command line argument parsing and validation.

use crate::bundle::{ReleaseBundleIdentity, ReleaseNotesSyntax};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Release bundle distribution client
#[derive(Parser, Debug)]
#[command(
    name = "rbdist",
    version,
    about = "Create, sign, distribute and clean up release bundles",
    long_about = "Drive release bundles through their lifecycle on a distribution service.

Usage:
  rbdist create app 1.0.0 'libs-release/app/*.jar' --sign
  rbdist distribute app 1.0.0 --site 'edge-*' --sync
  rbdist delete app 1.0.0 --delete-from-dist --quiet
  rbdist cleanup cli-test --bundle-version 1.0.0

Connection settings come from the config file, RBDIST_* environment
variables or the global flags below, in increasing priority."
)]
pub struct Args {
    /// Config file (default: <config dir>/rbdist/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Distribution service URL
    #[arg(long, global = true, value_name = "URL")]
    pub url: Option<String>,

    /// Basic-auth user
    #[arg(long, global = true)]
    pub user: Option<String>,

    /// Basic-auth password
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Bearer access token
    #[arg(long, global = true)]
    pub access_token: Option<String>,

    /// Suppress progress output and confirmation prompts
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Show extra detail
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Bundle name and version
#[derive(clap::Args, Debug, Clone)]
pub struct BundleArgs {
    /// Release bundle name
    pub name: String,
    /// Release bundle version
    pub version: String,
}

impl BundleArgs {
    /// Identity of the addressed bundle
    pub fn identity(&self) -> ReleaseBundleIdentity {
        ReleaseBundleIdentity::new(&self.name, &self.version)
    }
}

/// Content options shared by create and update
#[derive(clap::Args, Debug, Clone)]
pub struct ContentArgs {
    /// Source patterns (`repo/path/name`, wildcards allowed)
    #[arg(required = true, value_name = "PATTERN")]
    pub patterns: Vec<String>,

    /// Exclusion patterns, separated by ';'
    #[arg(long, value_delimiter = ';')]
    pub exclusions: Vec<String>,

    /// Sign the bundle as part of the request
    #[arg(long)]
    pub sign: bool,

    /// Free-text description
    #[arg(long = "desc")]
    pub description: Option<String>,

    /// File holding the release notes
    #[arg(long, value_name = "PATH")]
    pub release_notes_path: Option<PathBuf>,

    /// Release notes syntax (inferred from the file extension when omitted)
    #[arg(long, value_parser = parse_syntax)]
    pub release_notes_syntax: Option<ReleaseNotesSyntax>,

    /// Properties added to the bundle's artifacts (`k1=v1;k2=v2,v3`)
    #[arg(long, value_name = "PROPS")]
    pub target_props: Option<String>,

    /// Repository that stores the signed bundle
    #[arg(long)]
    pub storing_repository: Option<String>,

    /// Default target sites recorded with the bundle
    #[command(flatten)]
    pub rules: RuleArgs,

    /// Validate without changing anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Target site selection
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RuleArgs {
    /// JSON file with `distribution_rules`; overrides the flags below
    #[arg(long, value_name = "PATH")]
    pub dist_rules: Option<PathBuf>,

    /// Site name pattern
    #[arg(long)]
    pub site: Option<String>,

    /// City name pattern
    #[arg(long)]
    pub city: Option<String>,

    /// Country codes, separated by ','
    #[arg(long, value_delimiter = ',')]
    pub country_codes: Vec<String>,
}

impl RuleArgs {
    /// Whether no site selection was given
    pub fn is_empty(&self) -> bool {
        self.dist_rules.is_none()
            && self.site.is_none()
            && self.city.is_none()
            && self.country_codes.is_empty()
    }
}

/// What `wait` waits for
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitTarget {
    /// Every site reached a terminal state
    Distribution,
    /// The bundle exists locally
    Exists,
    /// The bundle no longer exists locally
    Absent,
    /// The distribution index no longer knows the bundle
    Deleted,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a release bundle
    Create {
        /// Bundle to create
        #[command(flatten)]
        bundle: BundleArgs,
        /// Bundle content
        #[command(flatten)]
        content: ContentArgs,
    },

    /// Replace the content of an unsigned release bundle
    Update {
        /// Bundle to update
        #[command(flatten)]
        bundle: BundleArgs,
        /// Replacement content
        #[command(flatten)]
        content: ContentArgs,
    },

    /// Sign a release bundle
    Sign {
        /// Bundle to sign
        #[command(flatten)]
        bundle: BundleArgs,
        /// Repository that stores the signed bundle
        #[arg(long)]
        storing_repository: Option<String>,
    },

    /// Distribute a signed release bundle to target sites
    Distribute {
        /// Bundle to distribute
        #[command(flatten)]
        bundle: BundleArgs,
        /// Target sites
        #[command(flatten)]
        rules: RuleArgs,
        /// Wait until every site reached a terminal state
        #[arg(long)]
        sync: bool,
        /// Upper bound for `--sync`, in minutes
        #[arg(long, requires = "sync")]
        max_wait_minutes: Option<u64>,
        /// Validate without distributing
        #[arg(long)]
        dry_run: bool,
    },

    /// Delete a release bundle
    Delete {
        /// Bundle to delete
        #[command(flatten)]
        bundle: BundleArgs,
        /// Sites the deletion applies to
        #[command(flatten)]
        rules: RuleArgs,
        /// Also delete the copies already distributed to the selected sites
        #[arg(long)]
        delete_from_dist: bool,
        /// Wait until the deletion is observable
        #[arg(long)]
        sync: bool,
        /// Validate without deleting
        #[arg(long)]
        dry_run: bool,
    },

    /// Show local state and per-site distribution status
    Status {
        /// Bundle to inspect
        #[command(flatten)]
        bundle: BundleArgs,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Wait for a bundle to reach a state
    Wait {
        /// Bundle to wait for
        #[command(flatten)]
        bundle: BundleArgs,
        /// Condition to wait for
        #[arg(long, value_enum, default_value = "distribution")]
        until: WaitTarget,
        /// Upper bound, in minutes
        #[arg(long)]
        max_wait_minutes: Option<u64>,
    },

    /// List release bundle names
    List {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Delete stale `<base>-<unix seconds>` bundles
    Cleanup {
        /// Base names the stale bundles derive from
        #[arg(required = true, value_name = "BASE_NAME")]
        base_names: Vec<String>,
        /// Version of the bundles to delete
        #[arg(long, value_name = "VERSION")]
        bundle_version: String,
        /// Retention window in hours
        #[arg(long, default_value_t = crate::sweep::DEFAULT_MAX_AGE_HOURS)]
        max_age_hours: i64,
    },
}

impl Command {
    /// Command name for messages
    pub fn name(&self) -> &'static str {
        match self {
            Command::Create { .. } => "create",
            Command::Update { .. } => "update",
            Command::Sign { .. } => "sign",
            Command::Distribute { .. } => "distribute",
            Command::Delete { .. } => "delete",
            Command::Status { .. } => "status",
            Command::Wait { .. } => "wait",
            Command::List { .. } => "list",
            Command::Cleanup { .. } => "cleanup",
        }
    }
}

fn parse_syntax(value: &str) -> Result<ReleaseNotesSyntax, String> {
    ReleaseNotesSyntax::parse(value)
        .ok_or_else(|| format!("unknown syntax '{value}' (expected markdown, asciidoc or plain_text)"))
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate arguments for consistency
    pub fn validate(&self) -> Result<(), String> {
        match &self.command {
            Command::Distribute {
                max_wait_minutes: Some(0),
                ..
            }
            | Command::Wait {
                max_wait_minutes: Some(0),
                ..
            } => Err("--max-wait-minutes must be at least 1".to_string()),
            Command::Cleanup { max_age_hours, .. } if *max_age_hours <= 0 => {
                Err("--max-age-hours must be positive".to_string())
            }
            Command::Cleanup { bundle_version, .. } if bundle_version.trim().is_empty() => {
                Err("--bundle-version must not be empty".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// Configuration derived from command line arguments
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    output: super::OutputManager,
}

impl RuntimeConfig {
    /// Get a reference to the output manager
    pub fn output(&self) -> &super::OutputManager {
        &self.output
    }

    /// Whether prompts and progress output are suppressed
    pub fn is_quiet(&self) -> bool {
        self.output.is_quiet()
    }
}

impl From<&Args> for RuntimeConfig {
    fn from(args: &Args) -> Self {
        Self {
            output: super::OutputManager::new(args.verbose, args.quiet),
        }
    }
}

//! Release bundle construction payload.

use super::ReleaseBundleIdentity;
use crate::error::{CliError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Markup used by release notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseNotesSyntax {
    /// Markdown
    Markdown,
    /// AsciiDoc
    Asciidoc,
    /// Plain text
    #[default]
    PlainText,
}

impl ReleaseNotesSyntax {
    /// Infer the syntax from a file extension
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("md" | "markdown") => ReleaseNotesSyntax::Markdown,
            Some("adoc" | "asciidoc") => ReleaseNotesSyntax::Asciidoc,
            _ => ReleaseNotesSyntax::PlainText,
        }
    }

    /// Parse a user-supplied syntax name
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "markdown" | "md" => Some(ReleaseNotesSyntax::Markdown),
            "asciidoc" | "adoc" => Some(ReleaseNotesSyntax::Asciidoc),
            "plain_text" | "plain" | "text" => Some(ReleaseNotesSyntax::PlainText),
            _ => None,
        }
    }
}

/// Release notes attached to a bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseNotes {
    /// Notes body
    #[serde(default)]
    pub content: String,
    /// Markup of `content`
    #[serde(default, deserialize_with = "lenient_syntax")]
    pub syntax: ReleaseNotesSyntax,
}

// Services report the syntax in either case and may omit it.
fn lenient_syntax<'de, D>(deserializer: D) -> std::result::Result<ReleaseNotesSyntax, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .and_then(ReleaseNotesSyntax::parse)
        .unwrap_or_default())
}

impl ReleaseNotes {
    /// Read notes from a file; the syntax defaults to the extension's
    pub fn from_file(path: &Path, syntax: Option<ReleaseNotesSyntax>) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| CliError::InvalidInputFile {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            content,
            syntax: syntax.unwrap_or_else(|| ReleaseNotesSyntax::from_path(path)),
        })
    }
}

/// Filter choosing which sites receive a distribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionRule {
    /// Site name pattern
    #[serde(default = "wildcard")]
    pub site_name: String,
    /// City name pattern
    #[serde(default = "wildcard")]
    pub city_name: String,
    /// Country code patterns
    #[serde(default = "wildcard_list")]
    pub country_codes: Vec<String>,
}

fn wildcard() -> String {
    "*".to_string()
}

fn wildcard_list() -> Vec<String> {
    vec![wildcard()]
}

impl Default for DistributionRule {
    fn default() -> Self {
        Self {
            site_name: wildcard(),
            city_name: wildcard(),
            country_codes: wildcard_list(),
        }
    }
}

impl DistributionRule {
    /// Rule matching the given site pattern in any city or country
    pub fn for_site(site_name: impl Into<String>) -> Self {
        Self {
            site_name: site_name.into(),
            ..Self::default()
        }
    }
}

/// On-disk distribution rules document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionRulesFile {
    /// Rules in the document
    pub distribution_rules: Vec<DistributionRule>,
}

impl DistributionRulesFile {
    /// Load and validate a rules file
    pub fn load(path: &Path) -> Result<Vec<DistributionRule>> {
        let invalid = |reason: String| CliError::InvalidInputFile {
            path: path.to_path_buf(),
            reason,
        };
        let raw = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let parsed: DistributionRulesFile =
            serde_json::from_str(&raw).map_err(|e| invalid(e.to_string()))?;
        if parsed.distribution_rules.is_empty() {
            return Err(invalid("no distribution rules defined".to_string()).into());
        }
        Ok(parsed.distribution_rules)
    }
}

/// Everything needed to create or update a release bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleDescriptor {
    /// Bundle identity
    pub identity: ReleaseBundleIdentity,
    /// Source artifact patterns (`repo/path/name`, wildcards allowed)
    pub file_spec_patterns: Vec<String>,
    /// Patterns of artifacts to leave out
    pub exclusion_patterns: Vec<String>,
    /// Sign immediately after creation
    pub sign: bool,
    /// Release notes
    pub release_notes: Option<ReleaseNotes>,
    /// Free-form description
    pub description: Option<String>,
    /// Properties added to every artifact in the bundle
    pub properties: BTreeMap<String, String>,
    /// Default distribution rules
    pub distribution_rules: Vec<DistributionRule>,
    /// Repository storing the signed bundle, when signing
    pub storing_repository: Option<String>,
    /// Validate only, do not persist
    pub dry_run: bool,
}

impl BundleDescriptor {
    /// Start building a descriptor for `identity`
    pub fn builder(identity: ReleaseBundleIdentity) -> DescriptorBuilder {
        DescriptorBuilder {
            descriptor: BundleDescriptor {
                identity,
                file_spec_patterns: Vec::new(),
                exclusion_patterns: Vec::new(),
                sign: false,
                release_notes: None,
                description: None,
                properties: BTreeMap::new(),
                distribution_rules: Vec::new(),
                storing_repository: None,
                dry_run: false,
            },
        }
    }
}

/// Builder for [`BundleDescriptor`]
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    descriptor: BundleDescriptor,
}

impl DescriptorBuilder {
    /// Add a source pattern
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.descriptor.file_spec_patterns.push(pattern.into());
        self
    }

    /// Add several source patterns
    pub fn patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.descriptor
            .file_spec_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Add exclusion patterns
    pub fn exclusions<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.descriptor
            .exclusion_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Sign immediately after creation
    pub fn sign(mut self, sign: bool) -> Self {
        self.descriptor.sign = sign;
        self
    }

    /// Attach release notes
    pub fn release_notes(mut self, notes: Option<ReleaseNotes>) -> Self {
        self.descriptor.release_notes = notes;
        self
    }

    /// Attach a description
    pub fn description(mut self, description: Option<String>) -> Self {
        self.descriptor.description = description;
        self
    }

    /// Add artifact properties
    pub fn properties(mut self, properties: BTreeMap<String, String>) -> Self {
        self.descriptor.properties.extend(properties);
        self
    }

    /// Add distribution rules
    pub fn distribution_rules(mut self, rules: Vec<DistributionRule>) -> Self {
        self.descriptor.distribution_rules.extend(rules);
        self
    }

    /// Repository storing the signed bundle
    pub fn storing_repository(mut self, repository: Option<String>) -> Self {
        self.descriptor.storing_repository = repository;
        self
    }

    /// Validate only
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.descriptor.dry_run = dry_run;
        self
    }

    /// Validate and finish
    pub fn build(self) -> Result<BundleDescriptor> {
        let d = &self.descriptor;
        if d.identity.name.trim().is_empty() || d.identity.version.trim().is_empty() {
            return Err(CliError::InvalidArguments {
                reason: "release bundle name and version must not be empty".to_string(),
            }
            .into());
        }
        if d.file_spec_patterns.is_empty() {
            return Err(CliError::InvalidArguments {
                reason: format!("release bundle {} needs at least one pattern", d.identity),
            }
            .into());
        }
        if let Some(bad) = d
            .file_spec_patterns
            .iter()
            .find(|p| !p.trim_start_matches('/').contains('/'))
        {
            return Err(CliError::InvalidArguments {
                reason: format!("pattern '{bad}' must be of the form <repository>/<path>"),
            }
            .into());
        }
        Ok(self.descriptor)
    }
}

/// Parse `key1=v1;key2=v2,v3` into a property map.
///
/// Values keep their comma-separated form; they are split when the request
/// is serialized.
pub fn parse_properties(raw: &str) -> Result<BTreeMap<String, String>> {
    let mut properties = BTreeMap::new();
    for pair in raw.split(';').map(str::trim).filter(|p| !p.is_empty()) {
        let (key, value) = pair.split_once('=').ok_or_else(|| CliError::InvalidArguments {
            reason: format!("property '{pair}' is not of the form key=value"),
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::InvalidArguments {
                reason: format!("property '{pair}' has an empty key"),
            }
            .into());
        }
        properties.insert(key.to_string(), value.trim().to_string());
    }
    Ok(properties)
}

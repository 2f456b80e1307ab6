//! Dependency catalog
//!
//! The catalog lives in `buildpack.toml` next to the buildpack binary:
//!
//! ```toml
//! [buildpack]
//! id = "paketo-buildpacks/node-engine"
//! name = "Node Engine Buildpack"
//! version = "1.2.3"
//!
//! [metadata.default-versions]
//! node = "18.*"
//!
//! [[metadata.dependencies]]
//! id = "node"
//! name = "Node Engine"
//! version = "18.12.1"
//! sha256 = "…"
//! uri = "https://nodejs.org/dist/v18.12.1/node-v18.12.1-linux-x64.tar.gz"
//! stacks = ["io.buildpacks.stacks.jammy"]
//! deprecation_date = "2025-04-30T00:00:00Z"
//! ```

use crate::error::{NodeEngineError, NodeEngineResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// File name of the catalog inside the buildpack directory
pub const CATALOG_FILE: &str = "buildpack.toml";

/// Stack entry matching every platform
pub const ANY_STACK: &str = "*";

/// Parsed `buildpack.toml`
#[derive(Debug, Clone, Deserialize)]
pub struct Catalog {
    /// Buildpack identity
    pub buildpack: BuildpackInfo,

    /// Defaults and dependencies
    #[serde(default)]
    pub metadata: CatalogMetadata,
}

/// `[buildpack]` section
#[derive(Debug, Clone, Deserialize)]
pub struct BuildpackInfo {
    pub id: String,
    pub name: String,
    pub version: String,
}

/// `[metadata]` section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogMetadata {
    /// Default constraint per dependency id
    #[serde(default, rename = "default-versions")]
    pub default_versions: HashMap<String, String>,

    /// Available artifacts
    #[serde(default)]
    pub dependencies: Vec<DependencyDescriptor>,
}

/// One installable artifact for one version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyDescriptor {
    /// Logical dependency id (`node`)
    pub id: String,

    /// Human-readable name
    #[serde(default)]
    pub name: String,

    /// Semantic version of the artifact
    pub version: String,

    /// Hex-encoded SHA-256 of the artifact, optionally `sha256:` prefixed
    #[serde(alias = "sha256")]
    pub checksum: String,

    /// Artifact location: `file://` relative to the buildpack, or HTTP(S)
    #[serde(rename = "uri")]
    pub source_uri: String,

    /// Supported platform (stack) identifiers
    #[serde(default)]
    pub stacks: Vec<String>,

    /// When the version stops being supported (RFC 3339 or `YYYY-MM-DD`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecation_date: Option<String>,
}

impl DependencyDescriptor {
    /// Whether the artifact runs on `platform`
    pub fn supports(&self, platform: &str) -> bool {
        self.stacks
            .iter()
            .any(|stack| stack == platform || stack == ANY_STACK)
    }

    /// Parsed deprecation date; unparseable dates are ignored
    pub fn deprecation(&self) -> Option<DateTime<Utc>> {
        let raw = self.deprecation_date.as_deref()?.trim();
        if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
            return Some(date.with_timezone(&Utc));
        }
        match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc()),
            Err(_) => {
                debug!("Ignoring unparseable deprecation date {:?}", raw);
                None
            }
        }
    }
}

impl Catalog {
    /// Load the catalog from a buildpack directory
    pub fn load(buildpack_dir: &Path) -> NodeEngineResult<Self> {
        Self::from_file(&buildpack_dir.join(CATALOG_FILE))
    }

    /// Load the catalog from a file
    pub fn from_file(path: &Path) -> NodeEngineResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeEngineError::io(format!("reading catalog {}", path.display()), e))?;
        let catalog = Self::parse(&content)?;
        debug!(
            "Loaded {} dependencies from {}",
            catalog.metadata.dependencies.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Parse a catalog from TOML
    pub fn parse(content: &str) -> NodeEngineResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Default constraint for a dependency id, empty when unset
    pub fn default_version(&self, id: &str) -> &str {
        self.metadata
            .default_versions
            .get(id)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// All descriptors in catalog order
    pub fn dependencies(&self) -> &[DependencyDescriptor] {
        &self.metadata.dependencies
    }
}

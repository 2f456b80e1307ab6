//! Error types for node-engine
//!
//! All modules use `NodeEngineResult<T>` as their return type. Every error is
//! fatal to the current build; nothing is retried.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for node-engine operations
pub type NodeEngineResult<T> = Result<T, NodeEngineError>;

/// All errors that can occur while resolving and installing the engine
#[derive(Error, Debug)]
pub enum NodeEngineError {
    // Version source errors
    #[error("Failed to read version source {path}: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse version source {path}: {reason}")]
    SourceParse { path: PathBuf, reason: String },

    #[error("Invalid version constraint {constraint:?} in {origin}: {reason}")]
    ConstraintParse {
        origin: String,
        constraint: String,
        reason: String,
    },

    #[error("Project path {0} does not exist")]
    ProjectPathMissing(PathBuf),

    // Resolution errors
    #[error("No version requirements for {0} were provided")]
    NoCandidates(String),

    #[error("Failed to satisfy {id:?} dependency version constraint {constraint:?}: no compatible versions on {platform}")]
    NoCompatibleVersion {
        id: String,
        constraint: String,
        platform: String,
    },

    #[error("Invalid catalog entry {id} {version}: {reason}")]
    CatalogInvalid {
        id: String,
        version: String,
        reason: String,
    },

    // Layer errors
    #[error("Layer metadata {key} was not a string")]
    MetadataType { key: String },

    #[error("Invalid layer record {path}: {reason}")]
    LayerRecord { path: PathBuf, reason: String },

    // Install errors
    #[error("Failed to fetch dependency {uri}: {reason}")]
    Fetch { uri: String, reason: String },

    #[error("Failed to decompress {uri}: {source}")]
    Decompress {
        uri: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read archive {uri}: {reason}")]
    ArchiveFormat { uri: String, reason: String },

    #[error("Invalid symlink {path} in archive: {reason}")]
    Symlink { path: PathBuf, reason: String },

    #[error("Checksum does not match for {uri}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        uri: String,
        expected: String,
        actual: String,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl NodeEngineError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a constraint parse error
    pub fn constraint(
        origin: impl Into<String>,
        constraint: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Self::ConstraintParse {
            origin: origin.into(),
            constraint: constraint.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a fetch error
    pub fn fetch(uri: impl Into<String>, reason: impl ToString) -> Self {
        Self::Fetch {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the installed layer contents may be partially written
    pub fn taints_layer(&self) -> bool {
        matches!(
            self,
            Self::Decompress { .. }
                | Self::ArchiveFormat { .. }
                | Self::Symlink { .. }
                | Self::ChecksumMismatch { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::NoCompatibleVersion { .. } => {
                Some("Check the versions listed in buildpack.toml or relax the version constraint")
            }
            Self::ConstraintParse { .. } => {
                Some("Use a semantic version or range such as 18, ~18.12 or >=16 <19")
            }
            Self::ChecksumMismatch { .. } => {
                Some("The artifact does not match its catalog checksum; rebuild to retry")
            }
            Self::MetadataType { .. } => Some("Clear the layer cache and rebuild"),
            Self::ProjectPathMissing(_) => Some("Check the value of BP_NODE_PROJECT_PATH"),
            _ => None,
        }
    }
}

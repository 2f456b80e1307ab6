//! Layer records
//!
//! A layer is a directory under the layers root plus a `<name>.toml`
//! metadata file the platform round-trips between builds:
//!
//! ```toml
//! launch = true
//! build = false
//! cache = false
//!
//! [metadata]
//! dependency-sha = "…"
//! built_at = "2026-10-19T08:00:00.000000000Z"
//! ```

use crate::error::{NodeEngineError, NodeEngineResult};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Metadata key holding the installed artifact checksum
pub const DEPENDENCY_SHA_KEY: &str = "dependency-sha";

/// Metadata key holding the install timestamp
pub const BUILT_AT_KEY: &str = "built_at";

/// On-disk shape of `<name>.toml`
#[derive(Debug, Default, Serialize, Deserialize)]
struct LayerToml {
    #[serde(default)]
    launch: bool,
    #[serde(default)]
    build: bool,
    #[serde(default)]
    cache: bool,
    #[serde(default)]
    metadata: toml::Table,
}

/// A layer directory and its persisted metadata
#[derive(Debug, Clone)]
pub struct LayerRecord {
    /// Layer name
    pub name: String,

    /// Layer contents directory
    pub path: PathBuf,

    /// Needed at build time
    pub build: bool,

    /// Needed at launch time
    pub launch: bool,

    /// Kept between builds
    pub cache: bool,

    /// Free-form metadata; only the checksum and timestamp are interpreted
    pub metadata: toml::Table,
}

impl LayerRecord {
    /// Load the record for `name`, or an empty one if none was persisted
    pub fn load(layers_dir: &Path, name: &str) -> NodeEngineResult<Self> {
        let toml_path = Self::toml_path_for(layers_dir, name);
        let stored = match std::fs::read_to_string(&toml_path) {
            Ok(content) => {
                toml::from_str::<LayerToml>(&content).map_err(|e| NodeEngineError::LayerRecord {
                    path: toml_path.clone(),
                    reason: e.to_string(),
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LayerToml::default(),
            Err(e) => {
                return Err(NodeEngineError::io(
                    format!("reading layer record {}", toml_path.display()),
                    e,
                ))
            }
        };

        debug!("Loaded layer record {}", toml_path.display());
        Ok(Self {
            name: name.to_string(),
            path: layers_dir.join(name),
            build: stored.build,
            launch: stored.launch,
            cache: stored.cache,
            metadata: stored.metadata,
        })
    }

    /// Path of the metadata file
    pub fn toml_path(&self) -> PathBuf {
        let layers_dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        Self::toml_path_for(layers_dir, &self.name)
    }

    fn toml_path_for(layers_dir: &Path, name: &str) -> PathBuf {
        layers_dir.join(format!("{name}.toml"))
    }

    /// Write flags and metadata to `<name>.toml`
    pub fn persist(&self) -> NodeEngineResult<()> {
        let stored = LayerToml {
            launch: self.launch,
            build: self.build,
            cache: self.cache,
            metadata: self.metadata.clone(),
        };
        let toml_path = self.toml_path();
        let content = toml::to_string_pretty(&stored)?;
        std::fs::write(&toml_path, content).map_err(|e| {
            NodeEngineError::io(format!("writing layer record {}", toml_path.display()), e)
        })?;
        debug!("Persisted layer record {}", toml_path.display());
        Ok(())
    }

    /// Empty the layer directory and forget all metadata and flags
    pub fn reset(&mut self) -> NodeEngineResult<()> {
        reset_dir(&self.path)?;
        self.build = false;
        self.launch = false;
        self.cache = false;
        self.metadata.clear();
        Ok(())
    }

    /// Checksum recorded by the last install.
    ///
    /// Fails when the value exists but is not a string.
    pub fn stored_checksum(&self) -> NodeEngineResult<Option<&str>> {
        match self.metadata.get(DEPENDENCY_SHA_KEY) {
            None => Ok(None),
            Some(toml::Value::String(sha)) => Ok(Some(sha)),
            Some(_) => Err(NodeEngineError::MetadataType {
                key: DEPENDENCY_SHA_KEY.to_string(),
            }),
        }
    }

    /// Time of the last install, if recorded and parseable
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.metadata.get(BUILT_AT_KEY)?.as_str()?;
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Record a completed install of the artifact with `checksum`
    pub fn record_install(&mut self, checksum: &str, now: DateTime<Utc>) {
        self.metadata
            .insert(DEPENDENCY_SHA_KEY.to_string(), checksum.into());
        self.metadata.insert(
            BUILT_AT_KEY.to_string(),
            now.to_rfc3339_opts(SecondsFormat::Nanos, true).into(),
        );
    }
}

/// Remove everything under `dir` and recreate it empty
pub fn reset_dir(dir: &Path) -> NodeEngineResult<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(NodeEngineError::io(
                format!("removing layer {}", dir.display()),
                e,
            ))
        }
    }
    std::fs::create_dir_all(dir)
        .map_err(|e| NodeEngineError::io(format!("creating layer {}", dir.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    #[test]
    fn missing_record_is_empty() {
        let temp = TempDir::new().unwrap();
        let record = LayerRecord::load(temp.path(), "node").unwrap();
        assert_eq!(record.path, temp.path().join("node"));
        assert!(!record.build && !record.launch && !record.cache);
        assert_eq!(record.stored_checksum().unwrap(), None);
        assert_eq!(record.created_at(), None);
    }

    #[test]
    fn persist_and_reload() {
        let temp = TempDir::new().unwrap();
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 8, 30, 0).unwrap();

        let mut record = LayerRecord::load(temp.path(), "node").unwrap();
        record.launch = true;
        record.record_install("abc123", now);
        record.persist().unwrap();

        let reloaded = LayerRecord::load(temp.path(), "node").unwrap();
        assert!(reloaded.launch);
        assert!(!reloaded.build);
        assert_eq!(reloaded.stored_checksum().unwrap(), Some("abc123"));
        assert_eq!(reloaded.created_at(), Some(now));
    }

    #[test]
    fn non_string_checksum_is_a_type_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("node.toml"),
            "launch = true\n[metadata]\ndependency-sha = 42\n",
        )
        .unwrap();

        let record = LayerRecord::load(temp.path(), "node").unwrap();
        assert!(matches!(
            record.stored_checksum(),
            Err(NodeEngineError::MetadataType { .. })
        ));
    }

    #[test]
    fn corrupt_record_errors() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("node.toml"), "launch = [").unwrap();
        assert!(matches!(
            LayerRecord::load(temp.path(), "node"),
            Err(NodeEngineError::LayerRecord { .. })
        ));
    }

    #[test]
    fn reset_empties_directory_and_metadata() {
        let temp = TempDir::new().unwrap();
        let mut record = LayerRecord::load(temp.path(), "node").unwrap();
        std::fs::create_dir_all(record.path.join("bin")).unwrap();
        std::fs::write(record.path.join("bin").join("node"), "old").unwrap();
        record.build = true;
        record.record_install("abc123", Utc::now());

        record.reset().unwrap();

        assert!(record.path.is_dir());
        assert_eq!(std::fs::read_dir(&record.path).unwrap().count(), 0);
        assert!(record.metadata.is_empty());
        assert!(!record.build);
    }
}

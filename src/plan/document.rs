//! Build plan documents
//!
//! Detect writes a [`BuildPlan`] declaring what it provides and requires.
//! Build reads a [`BuildpackPlan`] whose entries may come from several
//! buildpacks, and writes back the refined plan (bill of materials).

use crate::catalog::DependencyDescriptor;
use crate::error::{NodeEngineError, NodeEngineResult};
use crate::plan::requirement::{VersionRequirement, KNOWN_FLAGS};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Metadata key holding the constraint
pub const VERSION_KEY: &str = "version";

/// Metadata key holding the source name
pub const VERSION_SOURCE_KEY: &str = "version-source";

/// Output of detection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildPlan {
    #[serde(default)]
    pub provides: Vec<Provision>,

    #[serde(default)]
    pub requires: Vec<PlanRequirement>,
}

/// A dependency this buildpack can provide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provision {
    pub name: String,
}

/// A dependency this buildpack requires, with version metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanRequirement {
    pub name: String,

    #[serde(default)]
    pub metadata: toml::Table,
}

impl From<&VersionRequirement> for PlanRequirement {
    fn from(req: &VersionRequirement) -> Self {
        let mut metadata = toml::Table::new();
        metadata.insert(VERSION_KEY.into(), req.constraint.clone().into());
        metadata.insert(VERSION_SOURCE_KEY.into(), req.source.clone().into());
        for flag in &req.flags {
            metadata.insert(flag.clone(), true.into());
        }
        Self {
            name: req.name.clone(),
            metadata,
        }
    }
}

/// Entries handed to build, or the refined plan build returns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildpackPlan {
    #[serde(default)]
    pub entries: Vec<PlanEntry>,
}

/// One plan entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanEntry {
    pub name: String,

    /// Legacy location of the constraint, superseded by metadata
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default)]
    pub metadata: toml::Table,
}

impl PlanEntry {
    /// Convert into a requirement; unknown metadata keys are ignored
    pub fn to_requirement(&self) -> VersionRequirement {
        let text = |key: &str| {
            self.metadata
                .get(key)
                .and_then(toml::Value::as_str)
                .map(str::to_string)
        };

        let constraint = text(VERSION_KEY)
            .or_else(|| self.version.clone())
            .unwrap_or_default();
        let source = text(VERSION_SOURCE_KEY).unwrap_or_default();

        let mut req = VersionRequirement::new(&self.name, source, constraint);
        for flag in KNOWN_FLAGS {
            if self.metadata.get(flag).and_then(toml::Value::as_bool) == Some(true) {
                req = req.with_flag(flag);
            }
        }
        req
    }

    /// Bill-of-materials entry for an installed descriptor
    pub fn bill_of_materials(descriptor: &DependencyDescriptor) -> Self {
        let mut metadata = toml::Table::new();
        metadata.insert("licenses".into(), toml::Value::Array(Vec::new()));
        metadata.insert("name".into(), descriptor.name.clone().into());
        metadata.insert("sha256".into(), descriptor.checksum.clone().into());
        metadata.insert(
            "stacks".into(),
            toml::Value::Array(
                descriptor
                    .stacks
                    .iter()
                    .map(|s| toml::Value::String(s.clone()))
                    .collect(),
            ),
        );
        metadata.insert("uri".into(), descriptor.source_uri.clone().into());

        Self {
            name: descriptor.id.clone(),
            version: Some(descriptor.version.clone()),
            metadata,
        }
    }
}

impl BuildpackPlan {
    /// Requirements from every entry, in file order
    pub fn requirements(&self) -> Vec<VersionRequirement> {
        self.entries.iter().map(PlanEntry::to_requirement).collect()
    }
}

/// Read a TOML plan document
pub fn read_plan<T: serde::de::DeserializeOwned>(path: &Path) -> NodeEngineResult<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| NodeEngineError::io(format!("reading plan {}", path.display()), e))?;
    Ok(toml::from_str(&content)?)
}

/// Write a TOML plan document
pub fn write_plan<T: Serialize>(path: &Path, plan: &T) -> NodeEngineResult<()> {
    let content = toml::to_string_pretty(plan)?;
    std::fs::write(path, content)
        .map_err(|e| NodeEngineError::io(format!("writing plan {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::requirement::{FLAG_BUILD, FLAG_LAUNCH, NODE};
    use tempfile::TempDir;

    #[test]
    fn entry_metadata_to_requirement() {
        let plan: BuildpackPlan = toml::from_str(
            r#"
[[entries]]
name = "node"
[entries.metadata]
version = "~10"
version-source = "package.json"
build = true

[[entries]]
name = "node"
version = "12.x"
[entries.metadata]
launch = true
"#,
        )
        .unwrap();

        let reqs = plan.requirements();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].constraint, "~10");
        assert_eq!(reqs[0].source, "package.json");
        assert!(reqs[0].has_flag(FLAG_BUILD));
        assert_eq!(reqs[1].constraint, "12.x");
        assert_eq!(reqs[1].source, "");
        assert!(reqs[1].has_flag(FLAG_LAUNCH));
    }

    #[test]
    fn requirement_to_build_plan_entry() {
        let req = VersionRequirement::new(NODE, ".nvmrc", "10.*");
        let entry = PlanRequirement::from(&req);
        assert_eq!(entry.metadata["version"].as_str(), Some("10.*"));
        assert_eq!(entry.metadata["version-source"].as_str(), Some(".nvmrc"));
    }

    #[test]
    fn write_then_read_plan() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("plan.toml");
        let plan = BuildPlan {
            provides: vec![Provision { name: NODE.into() }],
            requires: vec![PlanRequirement::from(&VersionRequirement::new(
                NODE,
                ".node-version",
                "12.4.*",
            ))],
        };

        write_plan(&path, &plan).unwrap();
        let loaded: BuildPlan = read_plan(&path).unwrap();
        assert_eq!(loaded, plan);
    }
}

//! Build configuration
//!
//! Settings that the platform normally supplies through environment
//! variables. The library never reads the environment itself; the CLI maps
//! variables onto this struct so resolution stays deterministic.

use crate::error::{NodeEngineError, NodeEngineResult};
use crate::install::DEFAULT_STRIP_COMPONENTS;
use std::path::{Path, PathBuf};

/// Platform identifier used when none is configured
pub const DEFAULT_PLATFORM: &str = "io.buildpacks.stacks.jammy";

/// Explicit inputs that influence detection and build
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Version requested through `BP_NODE_VERSION`
    pub version_override: Option<String>,

    /// Force memory optimization regardless of `buildpack.yml`
    pub optimize_memory: bool,

    /// Project directory relative to the working directory
    pub project_path: Option<PathBuf>,

    /// Platform (stack) identifier descriptors must support
    pub platform: String,

    /// Leading path components stripped from archive entries
    pub strip_components: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            version_override: None,
            optimize_memory: false,
            project_path: None,
            platform: DEFAULT_PLATFORM.to_string(),
            strip_components: DEFAULT_STRIP_COMPONENTS,
        }
    }
}

impl BuildConfig {
    /// Set the platform identifier
    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Set the version override
    pub fn with_version_override(mut self, version: impl Into<String>) -> Self {
        let version = version.into();
        self.version_override = (!version.trim().is_empty()).then_some(version);
        self
    }

    /// Directory the version sources are read from.
    ///
    /// Fails when a configured project path does not exist.
    pub fn project_dir(&self, working_dir: &Path) -> NodeEngineResult<PathBuf> {
        let Some(ref relative) = self.project_path else {
            return Ok(working_dir.to_path_buf());
        };

        let dir = working_dir.join(relative);
        if !dir.is_dir() {
            return Err(NodeEngineError::ProjectPathMissing(dir));
        }
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults() {
        let config = BuildConfig::default();
        assert_eq!(config.platform, DEFAULT_PLATFORM);
        assert_eq!(config.strip_components, 1);
        assert!(config.version_override.is_none());
    }

    #[test]
    fn blank_override_is_ignored() {
        let config = BuildConfig::default().with_version_override("  ");
        assert!(config.version_override.is_none());

        let config = BuildConfig::default().with_version_override("~18");
        assert_eq!(config.version_override.as_deref(), Some("~18"));
    }

    #[test]
    fn project_dir_defaults_to_working_dir() {
        let temp = TempDir::new().unwrap();
        let config = BuildConfig::default();
        assert_eq!(config.project_dir(temp.path()).unwrap(), temp.path());
    }

    #[test]
    fn project_dir_must_exist() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("app")).unwrap();

        let config = BuildConfig {
            project_path: Some(PathBuf::from("app")),
            ..Default::default()
        };
        assert_eq!(
            config.project_dir(temp.path()).unwrap(),
            temp.path().join("app")
        );

        let config = BuildConfig {
            project_path: Some(PathBuf::from("missing")),
            ..Default::default()
        };
        assert!(matches!(
            config.project_dir(temp.path()),
            Err(NodeEngineError::ProjectPathMissing(_))
        ));
    }
}

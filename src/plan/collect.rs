//! Candidate collection
//!
//! Runs every version source parser against the project directory and
//! gathers one requirement per source that declares a version.

use crate::config::BuildConfig;
use crate::error::{NodeEngineError, NodeEngineResult};
use crate::plan::requirement::{VersionRequirement, NODE, VERSION_OVERRIDE_SOURCE};
use crate::version::{VersionConstraint, VersionSource};
use std::path::Path;
use tracing::debug;

/// Collect requirements from the configured override and the project files.
///
/// Sources without a declaration are skipped, so the result may be empty.
pub fn collect_candidates(
    working_dir: &Path,
    config: &BuildConfig,
) -> NodeEngineResult<Vec<VersionRequirement>> {
    let project_dir = config.project_dir(working_dir)?;
    let mut candidates = Vec::new();

    if let Some(ref version) = config.version_override {
        let version = version.trim();
        VersionConstraint::parse(version)
            .map_err(|e| NodeEngineError::constraint(VERSION_OVERRIDE_SOURCE, version, e))?;
        candidates.push(VersionRequirement::new(
            NODE,
            VERSION_OVERRIDE_SOURCE,
            version,
        ));
    }

    for source in VersionSource::ALL {
        let version = source.parse_version(&project_dir.join(source.file_name()))?;
        if version.is_empty() {
            continue;
        }
        candidates.push(VersionRequirement::new(NODE, source.file_name(), version));
    }

    debug!(
        "Collected {} version candidates from {}",
        candidates.len(),
        project_dir.display()
    );
    Ok(candidates)
}

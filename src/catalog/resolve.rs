//! Catalog resolution
//!
//! Turns the winning requirement into the concrete descriptor to install:
//! the highest catalog version that satisfies the constraint on the
//! target platform.

use crate::catalog::metadata::DependencyDescriptor;
use crate::error::{NodeEngineError, NodeEngineResult};
use crate::plan::VersionRequirement;
use crate::version::{parse_version, VersionConstraint};
use semver::Version;
use tracing::debug;

/// Constraint token meaning "use the catalog default"
pub const DEFAULT_TOKEN: &str = "default";

/// The requirement together with the descriptor chosen for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSelection {
    pub requirement: VersionRequirement,
    pub descriptor: DependencyDescriptor,
}

/// Constraint actually applied for a requirement
pub fn effective_constraint(requirement: &VersionRequirement, default_constraint: &str) -> String {
    let requested = requirement.constraint.trim();
    if !requested.is_empty() && requested != DEFAULT_TOKEN {
        return requested.to_string();
    }

    let default = default_constraint.trim();
    if default.is_empty() {
        "*".to_string()
    } else {
        default.to_string()
    }
}

/// Select the highest-version descriptor satisfying the requirement.
///
/// Among identical versions the first one in catalog order wins.
pub fn resolve(
    catalog: &[DependencyDescriptor],
    default_constraint: &str,
    platform: &str,
    requirement: &VersionRequirement,
) -> NodeEngineResult<DependencyDescriptor> {
    let constraint_text = effective_constraint(requirement, default_constraint);
    let constraint = VersionConstraint::parse(&constraint_text).map_err(|e| {
        NodeEngineError::constraint(requirement.source_label(), &constraint_text, e)
    })?;

    let mut best: Option<(Version, &DependencyDescriptor)> = None;

    for descriptor in catalog
        .iter()
        .filter(|d| d.id == requirement.name && d.supports(platform))
    {
        let version =
            parse_version(&descriptor.version).map_err(|e| NodeEngineError::CatalogInvalid {
                id: descriptor.id.clone(),
                version: descriptor.version.clone(),
                reason: e.to_string(),
            })?;

        if !constraint.matches(&version) {
            continue;
        }

        let newer = best
            .as_ref()
            .map_or(true, |(current, _)| version > *current);
        if newer {
            best = Some((version, descriptor));
        }
    }

    match best {
        Some((version, descriptor)) => {
            debug!(
                "Resolved {} {:?} on {} to {}",
                requirement.name, constraint_text, platform, version
            );
            Ok(descriptor.clone())
        }
        None => Err(NodeEngineError::NoCompatibleVersion {
            id: requirement.name.clone(),
            constraint: constraint_text,
            platform: platform.to_string(),
        }),
    }
}

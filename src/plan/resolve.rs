//! Plan entry resolution
//!
//! Picks the single winning requirement for a dependency by source
//! priority, and merges auxiliary flags from every candidate so a lower
//! priority "needed at build time" signal is not lost.

use crate::error::{NodeEngineError, NodeEngineResult};
use crate::plan::requirement::{VersionRequirement, VERSION_OVERRIDE_SOURCE};
use std::cmp::Reverse;
use tracing::debug;

/// Source priorities, highest wins. Unlisted sources rank at -1.
pub const SOURCE_PRIORITIES: &[(&str, i32)] = &[
    (VERSION_OVERRIDE_SOURCE, 5),
    ("buildpack.yml", 4),
    ("package.json", 3),
    (".nvmrc", 2),
    (".node-version", 1),
];

/// Priority of a source name
pub fn priority(source: &str) -> i32 {
    SOURCE_PRIORITIES
        .iter()
        .find(|(name, _)| *name == source)
        .map_or(-1, |(_, priority)| *priority)
}

/// Outcome of resolving one dependency's requirements
#[derive(Debug, Clone)]
pub struct EntryResolution {
    /// Winning requirement carrying the merged flags
    pub chosen: VersionRequirement,

    /// All candidates for the dependency, highest priority first
    pub candidates: Vec<VersionRequirement>,
}

/// Resolve the requirements for `name`.
///
/// Requirements for other dependencies are ignored. Equal priorities keep
/// their input order.
pub fn resolve_entry(
    name: &str,
    requirements: &[VersionRequirement],
) -> NodeEngineResult<EntryResolution> {
    let mut candidates: Vec<VersionRequirement> = requirements
        .iter()
        .filter(|req| req.name == name)
        .cloned()
        .collect();

    // sort_by_key is stable
    candidates.sort_by_key(|req| Reverse(priority(&req.source)));

    let Some(first) = candidates.first() else {
        return Err(NodeEngineError::NoCandidates(name.to_string()));
    };

    let mut chosen = first.clone();
    for candidate in &candidates {
        chosen.flags.extend(candidate.flags.iter().cloned());
    }

    debug!(
        "Resolved {} to {:?} from {} ({} candidates)",
        name,
        chosen.constraint,
        chosen.source_label(),
        candidates.len()
    );

    Ok(EntryResolution { chosen, candidates })
}

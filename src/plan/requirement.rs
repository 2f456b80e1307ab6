//! Version requirements
//!
//! A requirement is one source's opinion about which engine version to
//! install, tagged with the source it came from.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Dependency id of the engine
pub const NODE: &str = "node";

/// Source name for the `BP_NODE_VERSION` override
pub const VERSION_OVERRIDE_SOURCE: &str = "BP_NODE_VERSION";

/// Flag: the dependency is needed at build time
pub const FLAG_BUILD: &str = "build";

/// Flag: the dependency is needed at launch time
pub const FLAG_LAUNCH: &str = "launch";

/// Flag: the layer should be cached between builds
pub const FLAG_CACHE: &str = "cache";

/// Flags carried through plan entry metadata
pub const KNOWN_FLAGS: [&str; 3] = [FLAG_BUILD, FLAG_LAUNCH, FLAG_CACHE];

/// One source-tagged version constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRequirement {
    /// Logical dependency name (`node`)
    pub name: String,

    /// Where the constraint came from; empty when unknown
    pub source: String,

    /// Constraint expression; empty means "no preference"
    pub constraint: String,

    /// Auxiliary flags such as `build` and `launch`
    #[serde(default)]
    pub flags: BTreeSet<String>,
}

impl VersionRequirement {
    /// Create a requirement without flags
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            constraint: constraint.into(),
            flags: BTreeSet::new(),
        }
    }

    /// The lowest-priority entry: unknown source, no preference
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self::new(name, "", "")
    }

    /// Add a flag
    pub fn with_flag(mut self, flag: &str) -> Self {
        self.flags.insert(flag.to_string());
        self
    }

    /// Whether a flag is set
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }

    /// Source name for display, `<unknown>` when absent
    pub fn source_label(&self) -> &str {
        if self.source.is_empty() {
            "<unknown>"
        } else {
            &self.source
        }
    }

    /// Constraint for display, `*` when there is no preference
    pub fn constraint_label(&self) -> &str {
        if self.constraint.is_empty() {
            "*"
        } else {
            &self.constraint
        }
    }
}

//! Build plan handling
//!
//! Requirements are gathered from version sources (or from a plan handed
//! over by the platform), then narrowed to a single winning entry.

pub mod collect;
pub mod document;
pub mod requirement;
pub mod resolve;

pub use collect::collect_candidates;
pub use document::{BuildPlan, BuildpackPlan, PlanEntry, PlanRequirement, Provision};
pub use requirement::{VersionRequirement, FLAG_BUILD, FLAG_CACHE, FLAG_LAUNCH, NODE};
pub use resolve::{priority, resolve_entry, EntryResolution};

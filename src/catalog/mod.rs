//! Dependency catalog
//!
//! Loads the descriptors a buildpack ships with and selects the one to
//! install for a requirement.

pub mod metadata;
pub mod resolve;

pub use metadata::{Catalog, DependencyDescriptor, CATALOG_FILE};
pub use resolve::{effective_constraint, resolve, ResolvedSelection};

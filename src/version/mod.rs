//! Version declarations
//!
//! Parses the version files found in a project and the constraint dialect
//! they share.

pub mod constraint;
pub mod source;

pub use constraint::{parse_version, ConstraintError, VersionConstraint};
pub use source::{load_buildpack_yml, BuildpackYmlConfig, VersionSource, LTS_RELEASES};

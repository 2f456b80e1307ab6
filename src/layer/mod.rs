//! Layer management
//!
//! A layer is the directory the runtime is extracted into, plus the
//! metadata record that lets the next build decide whether the extracted
//! contents can be reused.

pub mod cache;
pub mod env;
pub mod record;

pub use cache::cache_matches;
pub use env::{configure, EnvAction, EnvEntry, LayerEnvironment};
pub use record::{reset_dir, LayerRecord, BUILT_AT_KEY, DEPENDENCY_SHA_KEY};

//! Dependency installation
//!
//! Fetch an artifact, hash it while it streams, and unpack it into a layer.

pub mod extract;
pub mod transport;
pub mod validated;

pub use extract::{ArchiveInstaller, DEFAULT_STRIP_COMPONENTS};
pub use transport::{DefaultTransport, Transport};
pub use validated::{Digest256, ValidatedReader};

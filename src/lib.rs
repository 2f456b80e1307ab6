//! Node Engine - Node.js runtime buildpack
//!
//! Selects a Node.js release from the versions an application declares,
//! resolves it against a dependency catalog, and installs it into a
//! cacheable layer with checksum verification.

pub mod build;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod install;
pub mod layer;
pub mod plan;
pub mod ui;
pub mod version;

pub use error::{NodeEngineError, NodeEngineResult};

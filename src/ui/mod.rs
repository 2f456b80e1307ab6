//! Terminal output
//!
//! The build log is plain indented text written to any writer, styled with
//! `console` when colors are enabled. An optional spinner decorates the
//! install step in interactive terminals only.

mod context;
mod log;
mod progress;

pub use context::UiContext;
pub use log::BuildLog;
pub use progress::InstallSpinner;

//! Progress indicator with CI fallback

use super::context::UiContext;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown on stderr while an artifact downloads and extracts.
///
/// In non-interactive mode it prints nothing; the build log already
/// records the step and its duration.
pub struct InstallSpinner {
    bar: Option<ProgressBar>,
}

impl InstallSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            bar: ctx.use_fancy_output().then(ProgressBar::new_spinner),
        }
    }

    /// A spinner that never draws
    pub fn hidden() -> Self {
        Self { bar: None }
    }

    pub fn start(&self, message: &str) {
        if let Some(ref bar) = self.bar {
            if let Ok(style) = ProgressStyle::default_spinner()
                .template("      {spinner:.cyan} {msg:.dim}  {elapsed:.dim}")
            {
                bar.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
            }
            bar.set_message(message.to_string());
            bar.enable_steady_tick(Duration::from_millis(120));
        }
    }

    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

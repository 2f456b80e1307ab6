//! Build log
//!
//! Human-readable output of the build phase. Lines are indented by level:
//! title, process (2), subprocess (4), action (6). Write failures are
//! ignored so that logging can never fail a build.

use crate::catalog::DependencyDescriptor;
use crate::layer::LayerEnvironment;
use crate::plan::VersionRequirement;
use chrono::{DateTime, Duration, Utc};
use console::style;
use std::fmt::Display;
use std::io::Write;

/// How close to its deprecation date a version starts warning
const DEPRECATION_WARNING_DAYS: i64 = 30;

/// Line-oriented log writer
pub struct BuildLog<W: Write> {
    out: W,
}

impl<W: Write> BuildLog<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Consume the log and return the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn title(&mut self, message: impl Display) {
        writeln!(self.out, "{}", style(message).bold()).ok();
    }

    pub fn process(&mut self, message: impl Display) {
        writeln!(self.out, "  {}", message).ok();
    }

    pub fn subprocess(&mut self, message: impl Display) {
        writeln!(self.out, "    {}", message).ok();
    }

    pub fn action(&mut self, message: impl Display) {
        writeln!(self.out, "      {}", style(message).dim()).ok();
    }

    pub fn warning(&mut self, message: impl Display) {
        writeln!(self.out, "    {}", style(message).yellow()).ok();
    }

    pub fn break_line(&mut self) {
        writeln!(self.out).ok();
    }

    /// Ranked candidate listing, one aligned `source -> "constraint"` per line
    pub fn candidates(&mut self, candidates: &[VersionRequirement]) {
        self.subprocess("Candidate version sources (in priority order):");

        let width = candidates
            .iter()
            .map(|c| c.source_label().len())
            .max()
            .unwrap_or(0);
        for candidate in candidates {
            self.action(format!(
                "{:<width$} -> {:?}",
                candidate.source_label(),
                candidate.constraint_label(),
            ));
        }
        self.break_line();
    }

    /// Selected version plus a deprecation warning when one applies
    pub fn selected_dependency(
        &mut self,
        requirement: &VersionRequirement,
        descriptor: &DependencyDescriptor,
        now: DateTime<Utc>,
    ) {
        self.subprocess(format!(
            "Selected {} version (using {}): {}",
            descriptor.name,
            requirement.source_label(),
            descriptor.version
        ));

        if let Some(deprecation) = descriptor.deprecation() {
            if deprecation <= now {
                self.warning(format!(
                    "Version {} of {} is deprecated.",
                    descriptor.version, descriptor.name
                ));
                self.warning(format!(
                    "Migrate your application to a supported version of {}.",
                    descriptor.name
                ));
            } else if deprecation - Duration::days(DEPRECATION_WARNING_DAYS) < now {
                self.warning(format!(
                    "Version {} of {} will be deprecated after {}.",
                    descriptor.version,
                    descriptor.name,
                    deprecation.format("%Y-%m-%d")
                ));
                self.warning(format!(
                    "Migrate your application to a supported version of {} before this time.",
                    descriptor.name
                ));
            }
        }
        self.break_line();
    }

    pub fn completed(&mut self, elapsed: std::time::Duration) {
        let millis = elapsed.as_millis();
        if millis >= 1000 {
            self.action(format!("Completed in {:.3}s", elapsed.as_secs_f64()));
        } else {
            self.action(format!("Completed in {millis}ms"));
        }
    }

    /// Env files and profile.d scripts written to the layer
    pub fn environment(&mut self, env: &LayerEnvironment) {
        self.process("Configuring environment");
        for entry in &env.variables {
            self.subprocess(entry);
        }
        self.break_line();

        self.subprocess("Writing profile.d/0_memory_available.sh");
        self.action("Calculates available memory based on container limits at launch time.");
        self.action("Made available in the MEMORY_AVAILABLE environment variable.");
        if env.optimize_memory {
            self.break_line();
            self.subprocess("Writing profile.d/1_optimize_memory.sh");
            self.action(
                "Assigns the NODE_OPTIONS environment variable with flag setting to optimize memory.",
            );
            self.action(
                "Limits the total size of all objects on the heap to 75% of the MEMORY_AVAILABLE.",
            );
        }
        self.break_line();
    }
}

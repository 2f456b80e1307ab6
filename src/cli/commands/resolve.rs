//! Resolve command - show what a build would install

use crate::build::{self, Resolution};
use crate::catalog::{effective_constraint, DependencyDescriptor};
use crate::cli::args::{OutputFormat, ResolveArgs};
use crate::error::NodeEngineResult;
use crate::plan::document::read_plan;
use crate::plan::{BuildpackPlan, VersionRequirement, NODE};
use console::style;
use serde::Serialize;

#[derive(Serialize)]
struct ResolveOutput<'a> {
    platform: &'a str,
    constraint: String,
    candidates: &'a [VersionRequirement],
    selected: &'a DependencyDescriptor,
}

/// Execute the resolve command
pub fn execute(args: ResolveArgs) -> NodeEngineResult<()> {
    let config = args.config.to_build_config();

    let plan: Option<BuildpackPlan> = match args.plan {
        Some(ref path) if path.is_file() => Some(read_plan(path)?),
        _ => None,
    };

    let resolution =
        build::resolve_selection(&args.working_dir, &args.buildpack_dir, &config, plan.as_ref())?;
    let constraint = effective_constraint(
        &resolution.selection.requirement,
        resolution.catalog.default_version(NODE),
    );

    match args.format {
        OutputFormat::Text => print_text(&resolution, &constraint, &config.platform),
        OutputFormat::Json => {
            let output = ResolveOutput {
                platform: &config.platform,
                constraint,
                candidates: &resolution.entry.candidates,
                selected: &resolution.selection.descriptor,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn print_text(resolution: &Resolution, constraint: &str, platform: &str) {
    println!(
        "{:<16} {:<12}",
        style("SOURCE").bold(),
        style("CONSTRAINT").bold()
    );
    println!("{}", "-".repeat(29));
    for candidate in &resolution.entry.candidates {
        println!(
            "{:<16} {:<12}",
            candidate.source_label(),
            candidate.constraint_label()
        );
    }
    println!();

    let descriptor = &resolution.selection.descriptor;
    println!(
        "{} {} {} (constraint {:?}, platform {})",
        style("Selected").green().bold(),
        descriptor.name,
        descriptor.version,
        constraint,
        platform
    );
    println!("  {}: {}", style("uri").dim(), descriptor.source_uri);
    println!("  {}: {}", style("sha256").dim(), descriptor.checksum);
}

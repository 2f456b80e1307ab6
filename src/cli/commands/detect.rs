//! Detect command - write the build plan

use crate::build;
use crate::cli::args::DetectArgs;
use crate::error::NodeEngineResult;
use crate::plan::document::write_plan;

/// Execute the detect command
pub fn execute(args: DetectArgs) -> NodeEngineResult<()> {
    let config = args.config.to_build_config();
    let plan = build::detect(&args.working_dir, &config)?;

    match args.plan {
        Some(ref path) => write_plan(path, &plan)?,
        None => print!("{}", toml::to_string_pretty(&plan)?),
    }

    Ok(())
}

//! Build command - install or reuse the node layer

use crate::build::{self, BuildContext};
use crate::cli::args::BuildArgs;
use crate::error::NodeEngineResult;
use crate::install::DefaultTransport;
use crate::plan::document::{read_plan, write_plan};
use crate::plan::BuildpackPlan;
use crate::ui::{BuildLog, InstallSpinner, UiContext};
use chrono::Utc;
use tracing::debug;

/// Execute the build command
pub fn execute(args: BuildArgs) -> NodeEngineResult<()> {
    let config = args.config.to_build_config();

    let plan: Option<BuildpackPlan> = match args.plan {
        Some(ref path) if path.is_file() => Some(read_plan(path)?),
        _ => None,
    };

    let ctx = BuildContext {
        working_dir: &args.working_dir,
        buildpack_dir: &args.buildpack_dir,
        layers_dir: &args.layers_dir,
        plan: plan.as_ref(),
        config: &config,
        now: Utc::now(),
    };

    let ui = UiContext::detect();
    let spinner = InstallSpinner::new(&ui);
    let mut log = BuildLog::new(std::io::stdout().lock());
    let result = build::build(&ctx, &DefaultTransport, &mut log, &spinner)?;

    if let Some(ref path) = args.plan {
        write_plan(path, &result.bill_of_materials)?;
        debug!("Wrote bill of materials to {}", path.display());
    }

    Ok(())
}

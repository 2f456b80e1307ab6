//! CLI argument definitions using clap derive

use crate::config::{BuildConfig, DEFAULT_PLATFORM};
use crate::install::DEFAULT_STRIP_COMPONENTS;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Node Engine - installs the Node.js runtime into a build layer
///
/// Reads version declarations from the application, resolves them against
/// the buildpack's dependency catalog and installs the selected release.
#[derive(Parser, Debug)]
#[command(name = "node-engine")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the build plan for the application
    Detect(DetectArgs),

    /// Install (or reuse) the selected Node.js release into the layer
    Build(BuildArgs),

    /// Show which release a build would install
    Resolve(ResolveArgs),
}

/// Settings normally supplied by the platform environment
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Version constraint overriding every project file
    #[arg(long = "node-version", env = "BP_NODE_VERSION")]
    pub node_version: Option<String>,

    /// Cap the V8 heap at 75% of available memory
    #[arg(long, env = "BP_NODE_OPTIMIZE_MEMORY")]
    pub optimize_memory: bool,

    /// Legacy spelling of BP_NODE_OPTIMIZE_MEMORY
    #[arg(long = "legacy-optimize-memory", env = "OPTIMIZE_MEMORY", hide = true)]
    pub legacy_optimize_memory: bool,

    /// Application directory relative to the working directory
    #[arg(long, env = "BP_NODE_PROJECT_PATH")]
    pub project_path: Option<PathBuf>,

    /// Stack identifier the release must support
    #[arg(long, env = "CNB_STACK_ID", default_value = DEFAULT_PLATFORM)]
    pub stack: String,

    /// Leading path components stripped from archive entries
    #[arg(long, default_value_t = DEFAULT_STRIP_COMPONENTS)]
    pub strip_components: usize,
}

impl ConfigArgs {
    /// Map the arguments onto the library configuration
    pub fn to_build_config(&self) -> BuildConfig {
        let mut config = BuildConfig::default().with_platform(self.stack.clone());
        if let Some(ref version) = self.node_version {
            config = config.with_version_override(version.clone());
        }
        config.optimize_memory = self.optimize_memory || self.legacy_optimize_memory;
        config.project_path = self
            .project_path
            .clone()
            .filter(|p| !p.as_os_str().is_empty());
        config.strip_components = self.strip_components;
        config
    }
}

/// Arguments for the detect command
#[derive(Parser, Debug)]
pub struct DetectArgs {
    /// Application source directory
    #[arg(long, default_value = ".")]
    pub working_dir: PathBuf,

    /// Where to write the build plan (stdout when omitted)
    #[arg(long)]
    pub plan: Option<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Arguments for the build command
#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Application source directory
    #[arg(long, default_value = ".")]
    pub working_dir: PathBuf,

    /// Buildpack directory containing buildpack.toml
    #[arg(long, env = "CNB_BUILDPACK_DIR")]
    pub buildpack_dir: PathBuf,

    /// Directory holding the layers
    #[arg(long)]
    pub layers_dir: PathBuf,

    /// Buildpack plan to read entries from; the bill of materials is written back
    #[arg(long)]
    pub plan: Option<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Arguments for the resolve command
#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Application source directory
    #[arg(long, default_value = ".")]
    pub working_dir: PathBuf,

    /// Buildpack directory containing buildpack.toml
    #[arg(long, env = "CNB_BUILDPACK_DIR")]
    pub buildpack_dir: PathBuf,

    /// Buildpack plan to read entries from
    #[arg(long)]
    pub plan: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    #[command(flatten)]
    pub config: ConfigArgs,
}

/// Output format for the resolve command
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable listing
    Text,
    /// JSON object
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn config_args_map_to_build_config() {
        let cli = Cli::try_parse_from([
            "node-engine",
            "detect",
            "--node-version",
            "18.x",
            "--legacy-optimize-memory",
            "--stack",
            "test-stack",
            "--project-path",
            "app",
        ])
        .unwrap();

        let Commands::Detect(args) = cli.command else {
            panic!("expected detect");
        };
        let config = args.config.to_build_config();
        assert_eq!(config.version_override.as_deref(), Some("18.x"));
        assert!(config.optimize_memory);
        assert_eq!(config.platform, "test-stack");
        assert_eq!(config.project_path, Some(PathBuf::from("app")));
        assert_eq!(config.strip_components, 1);
    }

    #[test]
    fn blank_version_is_no_override() {
        let cli =
            Cli::try_parse_from(["node-engine", "detect", "--node-version", " "]).unwrap();
        let Commands::Detect(args) = cli.command else {
            panic!("expected detect");
        };
        assert_eq!(args.config.to_build_config().version_override, None);
    }
}

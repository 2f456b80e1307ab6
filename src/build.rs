//! Detect and build pipelines
//!
//! Detect turns the project's version declarations into a build plan.
//! Build narrows the plan to one requirement, resolves it against the
//! catalog and either reuses the cached layer or installs the artifact.

use crate::catalog::{self, Catalog, DependencyDescriptor, ResolvedSelection};
use crate::config::BuildConfig;
use crate::error::{NodeEngineError, NodeEngineResult};
use crate::install::{ArchiveInstaller, Transport};
use crate::layer::{self, cache_matches, reset_dir, LayerRecord};
use crate::plan::{
    collect_candidates, resolve_entry, BuildPlan, BuildpackPlan, EntryResolution, PlanEntry,
    PlanRequirement, Provision, VersionRequirement, FLAG_BUILD, FLAG_CACHE, FLAG_LAUNCH, NODE,
};
use crate::ui::{BuildLog, InstallSpinner};
use crate::version::{load_buildpack_yml, parse_version, VersionSource};
use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Inputs of one build invocation
#[derive(Debug, Clone)]
pub struct BuildContext<'a> {
    /// Application source directory
    pub working_dir: &'a Path,

    /// Directory holding `buildpack.toml` and offline artifacts
    pub buildpack_dir: &'a Path,

    /// Root of the layer directories
    pub layers_dir: &'a Path,

    /// Plan handed over by the platform, if any
    pub plan: Option<&'a BuildpackPlan>,

    pub config: &'a BuildConfig,

    /// Timestamp recorded on install and used for deprecation checks
    pub now: DateTime<Utc>,
}

/// Outcome of a successful build
#[derive(Debug, Clone)]
pub struct BuildResult {
    pub layer: LayerRecord,
    pub selection: ResolvedSelection,
    /// The cached layer was kept as is
    pub reused: bool,
    /// Refined plan describing what was installed
    pub bill_of_materials: BuildpackPlan,
}

/// What would be installed, without side effects
#[derive(Debug, Clone)]
pub struct Resolution {
    pub catalog: Catalog,
    pub entry: EntryResolution,
    pub selection: ResolvedSelection,
}

/// Build the detection plan: provide `node`, require every declared version
pub fn detect(working_dir: &Path, config: &BuildConfig) -> NodeEngineResult<BuildPlan> {
    let candidates = collect_candidates(working_dir, config)?;
    info!("Detected {} node version declarations", candidates.len());

    Ok(BuildPlan {
        provides: vec![Provision {
            name: NODE.to_string(),
        }],
        requires: candidates.iter().map(PlanRequirement::from).collect(),
    })
}

/// Requirements for build: the plan's entries when present, otherwise
/// the project's own declarations, always followed by the placeholder.
pub fn requirements(
    working_dir: &Path,
    config: &BuildConfig,
    plan: Option<&BuildpackPlan>,
) -> NodeEngineResult<Vec<VersionRequirement>> {
    let mut requirements = match plan {
        Some(plan) if !plan.entries.is_empty() => {
            debug!("Using {} buildpack plan entries", plan.entries.len());
            plan.requirements()
        }
        _ => collect_candidates(working_dir, config)?,
    };
    requirements.push(VersionRequirement::placeholder(NODE));
    Ok(requirements)
}

/// Resolve what a build would install
pub fn resolve_selection(
    working_dir: &Path,
    buildpack_dir: &Path,
    config: &BuildConfig,
    plan: Option<&BuildpackPlan>,
) -> NodeEngineResult<Resolution> {
    let catalog = Catalog::load(buildpack_dir)?;
    let requirements = requirements(working_dir, config, plan)?;
    let (entry, descriptor) = select(&catalog, &requirements, &config.platform)?;

    Ok(Resolution {
        selection: ResolvedSelection {
            requirement: entry.chosen.clone(),
            descriptor,
        },
        entry,
        catalog,
    })
}

fn select(
    catalog: &Catalog,
    requirements: &[VersionRequirement],
    platform: &str,
) -> NodeEngineResult<(EntryResolution, DependencyDescriptor)> {
    let entry = resolve_entry(NODE, requirements)?;
    let descriptor = catalog::resolve(
        catalog.dependencies(),
        catalog.default_version(NODE),
        platform,
        &entry.chosen,
    )?;
    Ok((entry, descriptor))
}

/// Run the build phase
pub fn build<W: Write>(
    ctx: &BuildContext<'_>,
    transport: &dyn Transport,
    log: &mut BuildLog<W>,
    spinner: &InstallSpinner,
) -> NodeEngineResult<BuildResult> {
    let catalog = Catalog::load(ctx.buildpack_dir)?;
    log.title(format!(
        "{} {}",
        catalog.buildpack.name, catalog.buildpack.version
    ));
    log.process("Resolving Node Engine version");

    let requirements = requirements(ctx.working_dir, ctx.config, ctx.plan)?;
    let (entry, descriptor) = select(&catalog, &requirements, &ctx.config.platform)?;
    log.candidates(&entry.candidates);
    log.selected_dependency(&entry.chosen, &descriptor, ctx.now);

    let next_major = next_major_version(&catalog.buildpack.version);
    if entry.chosen.source == VersionSource::BuildpackYml.file_name() {
        log.warning(format!(
            "WARNING: Setting the Node version through buildpack.yml will be deprecated soon{next_major}."
        ));
        log.warning(
            "Please specify the version through the $BP_NODE_VERSION environment variable instead.",
        );
        log.break_line();
    }

    let chosen = &entry.chosen;
    let build = chosen.has_flag(FLAG_BUILD);
    // With no flags at all the runtime is still needed at launch; only a
    // build-only request leaves it out of the app image
    let launch = chosen.has_flag(FLAG_LAUNCH) || !build;
    let cache = build || chosen.has_flag(FLAG_CACHE);

    let mut record = LayerRecord::load(ctx.layers_dir, NODE)?;
    let selection = ResolvedSelection {
        requirement: chosen.clone(),
        descriptor,
    };
    let bill_of_materials = BuildpackPlan {
        entries: vec![PlanEntry::bill_of_materials(&selection.descriptor)],
    };

    if cache_matches(&record, &selection.descriptor)? {
        log.process(format!("Reusing cached layer {}", record.path.display()));
        log.break_line();
        info!("Reusing layer for {}", selection.descriptor.checksum);

        record.build = build;
        record.launch = launch;
        record.cache = cache;
        record.persist()?;

        return Ok(BuildResult {
            layer: record,
            selection,
            reused: true,
            bill_of_materials,
        });
    }

    log.process("Executing build process");
    record.reset()?;
    // An emptied layer must not keep the previous checksum on disk
    record.persist()?;
    record.build = build;
    record.launch = launch;
    record.cache = cache;

    let descriptor = &selection.descriptor;
    log.subprocess(format!("Installing {} {}", descriptor.name, descriptor.version));
    let started = Instant::now();
    spinner.start(&format!("Installing {} {}", descriptor.name, descriptor.version));
    let installed = ArchiveInstaller::new(transport)
        .with_strip_components(ctx.config.strip_components)
        .install(descriptor, ctx.buildpack_dir, &record.path);
    spinner.finish();

    if let Err(err) = installed {
        if err.taints_layer() {
            warn!("Discarding partially written layer {}", record.path.display());
            if let Err(cleanup) = reset_dir(&record.path) {
                warn!("Failed to discard layer: {}", cleanup);
            }
        }
        return Err(err);
    }
    log.completed(started.elapsed());
    log.break_line();

    record.record_install(&descriptor.checksum, ctx.now);

    let project_dir = ctx.config.project_dir(ctx.working_dir)?;
    let buildpack_yml = load_buildpack_yml(&project_dir.join(VersionSource::BuildpackYml.file_name()))?;
    if buildpack_yml.optimize_memory {
        log.warning(format!(
            "WARNING: Enabling memory optimization through buildpack.yml will be deprecated soon{next_major}."
        ));
        log.warning(
            "Please enable through the $BP_NODE_OPTIMIZE_MEMORY environment variable instead.",
        );
        log.break_line();
    }
    let optimize_memory = ctx.config.optimize_memory || buildpack_yml.optimize_memory;

    let version =
        parse_version(&descriptor.version).map_err(|e| NodeEngineError::CatalogInvalid {
            id: descriptor.id.clone(),
            version: descriptor.version.clone(),
            reason: e.to_string(),
        })?;
    let env = layer::configure(&record.path, &version, optimize_memory)?;
    log.environment(&env);

    record.persist()?;
    info!(
        "Installed {} {} into {}",
        descriptor.id,
        descriptor.version,
        record.path.display()
    );

    Ok(BuildResult {
        layer: record,
        selection,
        reused: false,
        bill_of_materials,
    })
}

/// ` in Node Engine Buildpack vN` for the next major, empty if unknown
fn next_major_version(buildpack_version: &str) -> String {
    match parse_version(buildpack_version) {
        Ok(version) => format!(" in Node Engine Buildpack v{}.0.0", version.major + 1),
        Err(_) => String::new(),
    }
}

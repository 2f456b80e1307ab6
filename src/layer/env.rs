//! Layer environment
//!
//! Env files live under `<layer>/env/` and follow the platform naming
//! convention `<NAME>.<action>`; launch-time scripts live under
//! `<layer>/profile.d/`.

use crate::error::{NodeEngineError, NodeEngineResult};
use semver::Version;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Computes `MEMORY_AVAILABLE` (MiB) from the cgroup limit unless already set
pub const MEMORY_AVAILABLE_SCRIPT: &str = r#"if [[ -z "$MEMORY_AVAILABLE" ]]; then
		memory_in_bytes="$(cat /sys/fs/cgroup/memory/memory.limit_in_bytes)"
		MEMORY_AVAILABLE="$(( $memory_in_bytes / ( 1024 * 1024 ) ))"
fi
export MEMORY_AVAILABLE"#;

/// Caps the V8 old space at 75% of `MEMORY_AVAILABLE`
pub const OPTIMIZE_MEMORY_SCRIPT: &str =
    r#"export NODE_OPTIONS="--max_old_space_size=$(( $MEMORY_AVAILABLE * 75 / 100 ))""#;

pub const MEMORY_AVAILABLE_FILE: &str = "0_memory_available.sh";
pub const OPTIMIZE_MEMORY_FILE: &str = "1_optimize_memory.sh";

/// First major version that reads `SSL_CERT_DIR`
const SSL_CERT_DIR_MIN_MAJOR: u64 = 18;
const SYSTEM_CERT_DIR: &str = "/etc/ssl/certs";

/// How an env file modifies a variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvAction {
    Override,
    Append,
}

impl EnvAction {
    fn suffix(self) -> &'static str {
        match self {
            EnvAction::Override => "override",
            EnvAction::Append => "append",
        }
    }
}

/// One variable written to the layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvEntry {
    pub name: String,
    pub action: EnvAction,
    pub value: String,
    pub delimiter: Option<String>,
}

impl fmt::Display for EnvEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            EnvAction::Override => write!(f, "{} -> {:?}", self.name, self.value),
            EnvAction::Append => write!(
                f,
                "{} -> ${}{}{:?}",
                self.name,
                self.name,
                self.delimiter.as_deref().unwrap_or_default(),
                self.value
            ),
        }
    }
}

/// Everything `configure` wrote, in write order
#[derive(Debug, Clone, Default)]
pub struct LayerEnvironment {
    pub variables: Vec<EnvEntry>,
    pub scripts: Vec<PathBuf>,
    pub optimize_memory: bool,
}

impl LayerEnvironment {
    fn override_var(&mut self, name: &str, value: impl Into<String>) {
        self.variables.push(EnvEntry {
            name: name.to_string(),
            action: EnvAction::Override,
            value: value.into(),
            delimiter: None,
        });
    }

    fn append_var(&mut self, name: &str, value: &str, delimiter: &str) {
        self.variables.push(EnvEntry {
            name: name.to_string(),
            action: EnvAction::Append,
            value: value.to_string(),
            delimiter: Some(delimiter.to_string()),
        });
    }
}

/// Write the runtime environment for a freshly installed layer
pub fn configure(
    layer_path: &Path,
    node_version: &Version,
    optimize_memory: bool,
) -> NodeEngineResult<LayerEnvironment> {
    let mut env = LayerEnvironment {
        optimize_memory,
        ..Default::default()
    };

    env.override_var("NODE_HOME", layer_path.to_string_lossy());
    env.override_var("NODE_ENV", "production");
    env.override_var("NODE_VERBOSE", "false");
    if node_version.major >= SSL_CERT_DIR_MIN_MAJOR {
        env.append_var("SSL_CERT_DIR", SYSTEM_CERT_DIR, ":");
    }

    let env_dir = layer_path.join("env");
    create_dir(&env_dir)?;
    for entry in &env.variables {
        let file = env_dir.join(format!("{}.{}", entry.name, entry.action.suffix()));
        write_file(&file, &entry.value)?;
        if let Some(delimiter) = &entry.delimiter {
            write_file(&env_dir.join(format!("{}.delim", entry.name)), delimiter)?;
        }
    }

    let profile_dir = layer_path.join("profile.d");
    create_dir(&profile_dir)?;

    let memory_available = profile_dir.join(MEMORY_AVAILABLE_FILE);
    write_file(&memory_available, MEMORY_AVAILABLE_SCRIPT)?;
    env.scripts.push(memory_available);

    if optimize_memory {
        let optimize = profile_dir.join(OPTIMIZE_MEMORY_FILE);
        write_file(&optimize, OPTIMIZE_MEMORY_SCRIPT)?;
        env.scripts.push(optimize);
    }

    debug!(
        "Wrote {} env files and {} profile scripts to {}",
        env.variables.len(),
        env.scripts.len(),
        layer_path.display()
    );
    Ok(env)
}

fn create_dir(dir: &Path) -> NodeEngineResult<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| NodeEngineError::io(format!("creating {}", dir.display()), e))
}

fn write_file(path: &Path, content: &str) -> NodeEngineResult<()> {
    std::fs::write(path, content)
        .map_err(|e| NodeEngineError::io(format!("writing {}", path.display()), e))
}

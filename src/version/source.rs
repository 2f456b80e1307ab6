//! Version source files
//!
//! Each recognized file in the project root declares a Node.js version in
//! its own dialect. All of them normalize to a constraint string; a missing
//! file yields an empty string, meaning "no preference".

use crate::error::{NodeEngineError, NodeEngineResult};
use crate::version::constraint::{core_components, parse_version, VersionConstraint};
use serde::Deserialize;
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;
use tracing::debug;

/// Long-term-support codenames and their major versions
pub const LTS_RELEASES: &[(&str, u64)] = &[
    ("argon", 4),
    ("boron", 6),
    ("carbon", 8),
    ("dubnium", 10),
    ("erbium", 12),
    ("fermium", 14),
    ("gallium", 16),
    ("hydrogen", 18),
    ("iron", 20),
    ("jod", 22),
];

/// Recognized version source files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionSource {
    /// `buildpack.yml`: YAML with `nodejs.version` and `nodejs.optimize-memory`
    BuildpackYml,
    /// `package.json`: the `engines.node` range
    PackageJson,
    /// `.nvmrc`: a version, range or nvm alias (`node`, `lts/*`, `lts/iron`)
    Nvmrc,
    /// `.node-version`: a single, possibly partial, version
    NodeVersion,
}

impl VersionSource {
    /// All file sources in collection order
    pub const ALL: [Self; 4] = [
        Self::BuildpackYml,
        Self::PackageJson,
        Self::Nvmrc,
        Self::NodeVersion,
    ];

    /// The fixed file name this source is read from
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::BuildpackYml => "buildpack.yml",
            Self::PackageJson => "package.json",
            Self::Nvmrc => ".nvmrc",
            Self::NodeVersion => ".node-version",
        }
    }

    /// Select the parser for a file name
    pub fn from_file_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.file_name() == name)
    }

    /// Read `path` and normalize its declaration into a constraint string.
    ///
    /// Returns an empty string when the file does not exist.
    pub fn parse_version(&self, path: &Path) -> NodeEngineResult<String> {
        let Some(content) = read_source(path)? else {
            debug!("{} not found", path.display());
            return Ok(String::new());
        };

        let version = match self {
            Self::BuildpackYml => parse_buildpack_yml(path, &content)?.version,
            Self::PackageJson => package_json_engine(path, &content)?,
            Self::Nvmrc => normalize_nvmrc(path, &content)?,
            Self::NodeVersion => normalize_node_version(path, &content)?,
        };

        debug!("{} declares {:?}", self, version);
        Ok(version)
    }
}

impl fmt::Display for VersionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file_name())
    }
}

/// The `nodejs` section of `buildpack.yml`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildpackYmlConfig {
    /// Declared version constraint
    pub version: String,

    /// Whether heap sizing should follow available memory
    pub optimize_memory: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BuildpackYml {
    nodejs: RawNodejsSection,
}

// YAML reads `version: 18` as a number, so accept any scalar here
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawNodejsSection {
    version: serde_yaml::Value,
    #[serde(rename = "optimize-memory")]
    optimize_memory: bool,
}

/// Load the `nodejs` section of a `buildpack.yml`, defaulting when absent
pub fn load_buildpack_yml(path: &Path) -> NodeEngineResult<BuildpackYmlConfig> {
    match read_source(path)? {
        Some(content) => parse_buildpack_yml(path, &content),
        None => Ok(BuildpackYmlConfig::default()),
    }
}

fn read_source(path: &Path) -> NodeEngineResult<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(NodeEngineError::SourceRead {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn parse_buildpack_yml(path: &Path, content: &str) -> NodeEngineResult<BuildpackYmlConfig> {
    if content.trim().is_empty() {
        return Ok(BuildpackYmlConfig::default());
    }

    let parsed: BuildpackYml =
        serde_yaml::from_str(content).map_err(|e| NodeEngineError::SourceParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let version = match parsed.nodejs.version {
        serde_yaml::Value::Null => String::new(),
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Number(n) => n.to_string(),
        other => {
            return Err(NodeEngineError::SourceParse {
                path: path.to_path_buf(),
                reason: format!("nodejs.version must be a scalar, found {other:?}"),
            })
        }
    };

    Ok(BuildpackYmlConfig {
        version: validate_constraint(path, &version)?,
        optimize_memory: parsed.nodejs.optimize_memory,
    })
}

fn package_json_engine(path: &Path, content: &str) -> NodeEngineResult<String> {
    let manifest: serde_json::Value =
        serde_json::from_str(content).map_err(|e| NodeEngineError::SourceParse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    match manifest.pointer("/engines/node") {
        None | Some(serde_json::Value::Null) => Ok(String::new()),
        Some(serde_json::Value::String(range)) => validate_constraint(path, range),
        Some(other) => Err(NodeEngineError::SourceParse {
            path: path.to_path_buf(),
            reason: format!("engines.node must be a string, found {other}"),
        }),
    }
}

fn normalize_nvmrc(path: &Path, content: &str) -> NodeEngineResult<String> {
    let content = content.trim().to_lowercase();

    if content == "node" {
        return Ok("*".to_string());
    }

    if let Some(codename) = content.strip_prefix("lts/") {
        let major = if codename == "*" {
            LTS_RELEASES.iter().map(|(_, major)| *major).max()
        } else {
            LTS_RELEASES
                .iter()
                .find(|(name, _)| *name == codename)
                .map(|(_, major)| *major)
        };

        return match major {
            Some(major) => Ok(format!("{major}.*")),
            None => Err(NodeEngineError::constraint(
                path.display().to_string(),
                content.clone(),
                "unknown LTS release name",
            )),
        };
    }

    validate_constraint(path, &content)
}

fn normalize_node_version(path: &Path, content: &str) -> NodeEngineResult<String> {
    let content = content.trim().to_lowercase();
    if content.is_empty() {
        return Ok(String::new());
    }

    let version = content.strip_prefix('v').unwrap_or(&content);
    parse_version(version)
        .map_err(|e| NodeEngineError::constraint(path.display().to_string(), &content, e))?;

    let padded = match core_components(version) {
        1 | 2 => format!("{version}.*"),
        _ => version.to_string(),
    };
    Ok(padded)
}

/// Trim, lower-case and strip a `v` prefix, then check the result parses.
fn validate_constraint(path: &Path, raw: &str) -> NodeEngineResult<String> {
    let content = raw.trim().to_lowercase();
    if content.is_empty() {
        return Ok(content);
    }

    let constraint = content.strip_prefix('v').unwrap_or(&content).to_string();
    VersionConstraint::parse(&constraint)
        .map_err(|e| NodeEngineError::constraint(path.display().to_string(), &content, e))?;
    Ok(constraint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, source: VersionSource, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(source.file_name());
        std::fs::write(&path, content).unwrap();
        path
    }

    fn parse(source: VersionSource, content: &str) -> NodeEngineResult<String> {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, source, content);
        source.parse_version(&path)
    }

    #[test]
    fn missing_file_is_no_preference() {
        let dir = TempDir::new().unwrap();
        for source in VersionSource::ALL {
            let version = source
                .parse_version(&dir.path().join(source.file_name()))
                .unwrap();
            assert_eq!(version, "");
        }
    }

    #[test]
    fn nvmrc_versions_and_ranges() {
        assert_eq!(parse(VersionSource::Nvmrc, "10.18.1\n").unwrap(), "10.18.1");
        assert_eq!(parse(VersionSource::Nvmrc, "V12.4").unwrap(), "12.4");
        assert_eq!(parse(VersionSource::Nvmrc, "~10").unwrap(), "~10");
    }

    #[test]
    fn nvmrc_aliases() {
        assert_eq!(parse(VersionSource::Nvmrc, "node").unwrap(), "*");
        assert_eq!(parse(VersionSource::Nvmrc, "lts/*").unwrap(), "22.*");
        assert_eq!(parse(VersionSource::Nvmrc, "LTS/Dubnium").unwrap(), "10.*");
        assert_eq!(parse(VersionSource::Nvmrc, "lts/gallium").unwrap(), "16.*");
    }

    #[test]
    fn nvmrc_rejects_garbage() {
        let err = parse(VersionSource::Nvmrc, "lts/unknown").unwrap_err();
        assert!(matches!(err, NodeEngineError::ConstraintParse { .. }));

        let err = parse(VersionSource::Nvmrc, "banana").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains(".nvmrc"));
        assert!(msg.contains("banana"));
    }

    #[test]
    fn v_prefix_matches_plain_version() {
        for version in ["10.18.1", "12", "14.2", "16.0.0-rc.1"] {
            for source in [VersionSource::Nvmrc, VersionSource::NodeVersion] {
                assert_eq!(
                    parse(source, &format!("v{version}")).unwrap(),
                    parse(source, version).unwrap()
                );
            }
        }
    }

    #[test]
    fn node_version_pads_partial_versions() {
        assert_eq!(parse(VersionSource::NodeVersion, "12").unwrap(), "12.*");
        assert_eq!(parse(VersionSource::NodeVersion, "v12.4").unwrap(), "12.4.*");
        assert_eq!(parse(VersionSource::NodeVersion, "12.4.0").unwrap(), "12.4.0");
    }

    #[test]
    fn node_version_rejects_ranges_and_aliases() {
        assert!(parse(VersionSource::NodeVersion, "~12").is_err());
        assert!(parse(VersionSource::NodeVersion, "lts/*").is_err());
    }

    #[test]
    fn buildpack_yml_version_and_flag() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            VersionSource::BuildpackYml,
            "nodejs:\n  version: 10.x\n  optimize-memory: true\n",
        );

        assert_eq!(VersionSource::BuildpackYml.parse_version(&path).unwrap(), "10.x");
        let config = load_buildpack_yml(&path).unwrap();
        assert!(config.optimize_memory);
    }

    #[test]
    fn buildpack_yml_numeric_version() {
        assert_eq!(
            parse(VersionSource::BuildpackYml, "nodejs:\n  version: 12\n").unwrap(),
            "12"
        );
    }

    #[test]
    fn buildpack_yml_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, VersionSource::BuildpackYml, "");
        assert_eq!(load_buildpack_yml(&path).unwrap(), BuildpackYmlConfig::default());

        let missing = dir.path().join("missing.yml");
        assert!(!load_buildpack_yml(&missing).unwrap().optimize_memory);
    }

    #[test]
    fn buildpack_yml_malformed() {
        let err = parse(VersionSource::BuildpackYml, "nodejs: [").unwrap_err();
        assert!(matches!(err, NodeEngineError::SourceParse { .. }));
    }

    #[test]
    fn package_json_engines() {
        let manifest = r#"{"name": "app", "engines": {"node": ">=10 <13"}}"#;
        assert_eq!(parse(VersionSource::PackageJson, manifest).unwrap(), ">=10 <13");

        let no_engines = r#"{"name": "app"}"#;
        assert_eq!(parse(VersionSource::PackageJson, no_engines).unwrap(), "");

        let wrong_type = r#"{"engines": {"node": 10}}"#;
        assert!(parse(VersionSource::PackageJson, wrong_type).is_err());
    }

    #[test]
    fn parser_selected_by_file_name() {
        assert_eq!(
            VersionSource::from_file_name(".nvmrc"),
            Some(VersionSource::Nvmrc)
        );
        assert_eq!(
            VersionSource::from_file_name(".node-version"),
            Some(VersionSource::NodeVersion)
        );
        assert_eq!(VersionSource::from_file_name("Cargo.toml"), None);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_source_is_an_error() {
        let dir = TempDir::new().unwrap();
        // a directory in place of the file cannot be read as text
        std::fs::create_dir(dir.path().join(".nvmrc")).unwrap();
        let err = VersionSource::Nvmrc
            .parse_version(&dir.path().join(".nvmrc"))
            .unwrap_err();
        assert!(matches!(err, NodeEngineError::SourceRead { .. }));
    }
}

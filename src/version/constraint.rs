//! Semantic version constraints
//!
//! Version files and package manifests use the npm range dialect
//! (`>=16 <19`, `^18 || ^20`, `16.x`, `1.2 - 1.4`). The `semver` crate only
//! understands comma separated Cargo-style requirements, so every
//! alternative is canonicalized before parsing. A bare version means
//! "equal to", and a partial version (`18`, `18.12`) matches its whole range.

use semver::{Version, VersionReq};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from parsing a constraint or a catalog version
#[derive(Error, Debug)]
pub enum ConstraintError {
    #[error("empty constraint")]
    Empty,

    #[error("empty alternative in {0:?}")]
    EmptyAlternative(String),

    #[error("{0}")]
    Semver(#[from] semver::Error),
}

/// A parsed constraint: satisfied when any alternative matches
#[derive(Debug, Clone)]
pub struct VersionConstraint {
    raw: String,
    alternatives: Vec<VersionReq>,
}

impl VersionConstraint {
    /// Parse an npm-style constraint expression
    pub fn parse(input: &str) -> Result<Self, ConstraintError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(ConstraintError::Empty);
        }

        let mut alternatives = Vec::new();
        for alternative in raw.split("||") {
            let alternative = alternative.trim();
            if alternative.is_empty() {
                return Err(ConstraintError::EmptyAlternative(raw.to_string()));
            }
            let canonical = canonicalize(alternative);
            alternatives.push(VersionReq::parse(&canonical)?);
        }

        Ok(Self {
            raw: raw.to_string(),
            alternatives,
        })
    }

    /// Whether the version satisfies any alternative
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// The expression as originally written
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for VersionConstraint {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Parse a version leniently: `v` prefix allowed, missing minor and patch
/// default to zero.
pub fn parse_version(input: &str) -> Result<Version, ConstraintError> {
    let trimmed = strip_v(input.trim());
    if trimmed.is_empty() {
        return Err(ConstraintError::Empty);
    }

    let split = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(split);

    let parts = core.split('.').count();
    let padded = match parts {
        1 => format!("{core}.0.0{suffix}"),
        2 => format!("{core}.0{suffix}"),
        _ => trimmed.to_string(),
    };

    Ok(Version::parse(&padded)?)
}

/// Number of numeric core components written in a version (`18.2` -> 2)
pub fn core_components(input: &str) -> usize {
    let trimmed = strip_v(input.trim());
    let core = trimmed.split(['-', '+']).next().unwrap_or_default();
    core.split('.').filter(|part| !part.is_empty()).count()
}

fn strip_v(input: &str) -> &str {
    input
        .strip_prefix('v')
        .or_else(|| input.strip_prefix('V'))
        .unwrap_or(input)
}

/// Rewrite one `||` alternative into `semver` requirement syntax.
fn canonicalize(alternative: &str) -> String {
    // Hyphen ranges need surrounding whitespace, otherwise `-` is a pre-release
    if let Some((low, high)) = alternative.split_once(" - ") {
        return format!(
            "{}, {}",
            comparator(">=", low.trim()),
            comparator("<=", high.trim())
        );
    }

    let mut comparators = Vec::new();
    let mut pending_op: Option<&str> = None;

    for token in alternative
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
    {
        let op_len = token
            .find(|c: char| !matches!(c, '<' | '>' | '=' | '~' | '^'))
            .unwrap_or(token.len());
        let (op, rest) = token.split_at(op_len);

        if rest.is_empty() {
            // operator written apart from its version (`>= 1.2`)
            pending_op = Some(op);
            continue;
        }

        let op = match pending_op.take() {
            Some(pending) if op.is_empty() => pending,
            _ => op,
        };
        comparators.push(comparator(op, rest));
    }

    if let Some(op) = pending_op {
        // dangling operator, let semver report it
        comparators.push(op.to_string());
    }

    comparators.join(", ")
}

fn comparator(op: &str, version: &str) -> String {
    let version = strip_v(version);
    let wildcard = is_wildcard(version);

    let version: String = version
        .split('.')
        .map(|part| match part {
            "x" | "X" => "*",
            other => other,
        })
        .collect::<Vec<_>>()
        .join(".");

    let op = match op {
        "" | "=" | "==" if wildcard => "",
        "" | "==" => "=",
        "~>" => "~",
        other => other,
    };

    format!("{op}{version}")
}

fn is_wildcard(version: &str) -> bool {
    version
        .split('.')
        .any(|part| matches!(part, "*" | "x" | "X"))
}

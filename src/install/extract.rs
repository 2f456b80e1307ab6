//! Archive installation
//!
//! Streams a gzip-compressed tarball from the transport through the
//! checksum reader and unpacks it into the layer directory. The digest is
//! only known once the whole stream has been consumed, so a corrupt
//! artifact is reported after files were written; the destination is reset
//! before every install for that reason.
//!
//! Entry paths and link targets are resolved against what is already on
//! disk, following symlinks extracted earlier, and anything that resolves
//! outside the destination is rejected.

use crate::catalog::DependencyDescriptor;
use crate::error::{NodeEngineError, NodeEngineResult};
use crate::install::transport::Transport;
use crate::install::validated::ValidatedReader;
use crate::layer::reset_dir;
use flate2::read::GzDecoder;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;
use tar::{Archive, EntryType};
use tracing::{debug, trace};

/// Leading path components removed from every entry by default
pub const DEFAULT_STRIP_COMPONENTS: usize = 1;

const MAX_LINK_HOPS: usize = 40;

/// Records the first error raised by the gzip decoder so that tar errors
/// caused by it can be reported as decompression failures.
#[derive(Clone, Default)]
struct DecodeFailure(Rc<RefCell<Option<io::Error>>>);

impl DecodeFailure {
    fn record(&self, err: &io::Error) {
        let mut slot = self.0.borrow_mut();
        if slot.is_none() {
            *slot = Some(io::Error::new(err.kind(), err.to_string()));
        }
    }

    fn take(&self) -> Option<io::Error> {
        self.0.borrow_mut().take()
    }
}

struct DecodeProbe<R> {
    inner: R,
    failure: DecodeFailure,
}

impl<R: Read> Read for DecodeProbe<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).inspect_err(|e| self.failure.record(e))
    }
}

/// Fetches, validates and extracts dependency archives
pub struct ArchiveInstaller<'a> {
    transport: &'a dyn Transport,
    strip_components: usize,
}

impl<'a> ArchiveInstaller<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self {
            transport,
            strip_components: DEFAULT_STRIP_COMPONENTS,
        }
    }

    pub fn with_strip_components(mut self, strip_components: usize) -> Self {
        self.strip_components = strip_components;
        self
    }

    /// Install the artifact of `descriptor` into `destination`.
    ///
    /// `file://` URIs are resolved against `source_root`.
    pub fn install(
        &self,
        descriptor: &DependencyDescriptor,
        source_root: &Path,
        destination: &Path,
    ) -> NodeEngineResult<()> {
        let uri = descriptor.source_uri.as_str();
        reset_dir(destination)?;

        let stream = self.transport.fetch(source_root, uri)?;
        let failure = DecodeFailure::default();
        let probe = DecodeProbe {
            inner: GzDecoder::new(ValidatedReader::new(stream, &descriptor.checksum)),
            failure: failure.clone(),
        };
        let mut archive = Archive::new(probe);

        let extracted = self.unpack(&mut archive, destination, uri, &failure);

        let validated = archive.into_inner().inner.into_inner();
        let digest = validated
            .finish()
            .map_err(|e| NodeEngineError::fetch(uri, e))?;
        if !digest.is_valid() {
            return Err(NodeEngineError::ChecksumMismatch {
                uri: uri.to_string(),
                expected: digest.expected,
                actual: digest.actual,
            });
        }

        extracted?;
        debug!("Installed {} into {}", uri, destination.display());
        Ok(())
    }

    fn unpack<R: Read>(
        &self,
        archive: &mut Archive<R>,
        destination: &Path,
        uri: &str,
        failure: &DecodeFailure,
    ) -> NodeEngineResult<()> {
        let classify = |err: io::Error| match failure.take() {
            Some(source) => NodeEngineError::Decompress {
                uri: uri.to_string(),
                source,
            },
            None => NodeEngineError::ArchiveFormat {
                uri: uri.to_string(),
                reason: err.to_string(),
            },
        };

        let root = ConfinedRoot::open(destination)?;
        let mut links = Vec::new();

        for entry in archive.entries().map_err(classify)? {
            let mut entry = entry.map_err(classify)?;
            let raw_path = entry.path().map_err(classify)?.into_owned();

            let Some(relative) = strip_path(&raw_path, self.strip_components, uri)? else {
                trace!("Skipping stripped entry {}", raw_path.display());
                continue;
            };

            match entry.header().entry_type() {
                EntryType::Directory => create_dir(&root.resolve_entry(&relative)?)?,
                EntryType::Regular | EntryType::Continuous => {
                    let target = root.place(&relative)?;
                    clear_entry(&target)?;
                    let mut file = File::create(&target).map_err(|e| {
                        NodeEngineError::io(format!("creating {}", target.display()), e)
                    })?;
                    io::copy(&mut entry, &mut file).map_err(classify)?;

                    let mode = entry.header().mode().map_err(classify)?;
                    set_mode(&target, mode)?;
                }
                EntryType::Symlink => {
                    let link = entry
                        .link_name()
                        .map_err(classify)?
                        .map(|name| name.into_owned())
                        .filter(|name| !name.as_os_str().is_empty())
                        .ok_or_else(|| NodeEngineError::Symlink {
                            path: relative.clone(),
                            reason: "no link target".to_string(),
                        })?;
                    let target = root.place(&relative)?;
                    root.check_link(&relative, &target, &link)?;
                    make_symlink(&link, &target)?;
                    links.push((relative, target, link));
                }
                EntryType::Link => {
                    let invalid = |reason: String| NodeEngineError::ArchiveFormat {
                        uri: uri.to_string(),
                        reason,
                    };
                    let source = entry
                        .link_name()
                        .map_err(classify)?
                        .map(|name| name.into_owned())
                        .ok_or_else(|| {
                            invalid(format!("hard link {} has no target", raw_path.display()))
                        })?;
                    let source_relative = strip_path(&source, self.strip_components, uri)?
                        .ok_or_else(|| {
                            invalid(format!(
                                "hard link {} targets stripped entry {}",
                                raw_path.display(),
                                source.display()
                            ))
                        })?;

                    let existing = root.resolve_entry(&source_relative)?;
                    let target = root.place(&relative)?;
                    clear_entry(&target)?;
                    std::fs::hard_link(&existing, &target).map_err(|e| {
                        invalid(format!(
                            "hard link {} -> {}: {e}",
                            relative.display(),
                            source_relative.display()
                        ))
                    })?;
                }
                other => {
                    trace!("Skipping {:?} entry {}", other, raw_path.display());
                }
            }
        }

        // A later entry can change what an earlier link resolves to
        for (relative, target, link) in &links {
            root.check_link(relative, target, link)?;
        }

        Ok(())
    }
}

/// The destination directory. Paths are resolved inside it the way the
/// kernel would, following symlinks already on disk, and never leave it.
struct ConfinedRoot {
    root: PathBuf,
}

enum Step {
    Parent,
    Name(OsString),
}

/// `None` for absolute paths
fn resolution_steps(path: &Path) -> Option<Vec<Step>> {
    let mut steps = Vec::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => return None,
            Component::CurDir => {}
            Component::ParentDir => steps.push(Step::Parent),
            Component::Normal(name) => steps.push(Step::Name(name.to_os_string())),
        }
    }
    Some(steps)
}

impl ConfinedRoot {
    fn open(destination: &Path) -> NodeEngineResult<Self> {
        let root = destination.canonicalize().map_err(|e| {
            NodeEngineError::io(format!("resolving {}", destination.display()), e)
        })?;
        Ok(Self { root })
    }

    /// Resolve `path` from `base`, both relative to the root. `Ok(None)`
    /// when resolution leaves the root.
    fn resolve(&self, base: &Path, path: &Path) -> io::Result<Option<PathBuf>> {
        let Some(steps) = resolution_steps(path) else {
            return Ok(None);
        };
        let mut pending = VecDeque::from(steps);
        let mut resolved = base.to_path_buf();
        let mut hops = 0;

        while let Some(step) = pending.pop_front() {
            let name = match step {
                Step::Parent => {
                    if !resolved.pop() {
                        return Ok(None);
                    }
                    continue;
                }
                Step::Name(name) => name,
            };

            let candidate = self.root.join(&resolved).join(&name);
            let is_link = std::fs::symlink_metadata(&candidate)
                .is_ok_and(|meta| meta.file_type().is_symlink());
            if !is_link {
                resolved.push(name);
                continue;
            }

            hops += 1;
            if hops > MAX_LINK_HOPS {
                return Err(io::Error::other("too many levels of symbolic links"));
            }
            let Some(link_steps) = resolution_steps(&std::fs::read_link(&candidate)?) else {
                return Ok(None);
            };
            for step in link_steps.into_iter().rev() {
                pending.push_front(step);
            }
        }

        Ok(Some(resolved))
    }

    /// Real location of an entry, every symlink along the way followed
    fn resolve_entry(&self, relative: &Path) -> NodeEngineResult<PathBuf> {
        match self.resolve(Path::new(""), relative) {
            Ok(Some(resolved)) => Ok(self.root.join(resolved)),
            Ok(None) => Err(NodeEngineError::Symlink {
                path: relative.to_path_buf(),
                reason: "resolves outside the destination".to_string(),
            }),
            Err(e) => Err(NodeEngineError::Symlink {
                path: relative.to_path_buf(),
                reason: e.to_string(),
            }),
        }
    }

    /// Where a new entry goes: the parent resolved and created, the final
    /// component kept as written
    fn place(&self, relative: &Path) -> NodeEngineResult<PathBuf> {
        let parent = self.resolve_entry(relative.parent().unwrap_or(Path::new("")))?;
        create_dir(&parent)?;
        Ok(parent.join(relative.file_name().unwrap_or_default()))
    }

    /// Reject absolute targets and targets that resolve outside the root
    /// from the directory holding `location`
    fn check_link(&self, relative: &Path, location: &Path, target: &Path) -> NodeEngineResult<()> {
        let invalid = |reason: String| NodeEngineError::Symlink {
            path: relative.to_path_buf(),
            reason,
        };
        if target.has_root() {
            return Err(invalid(format!("absolute target: {}", target.display())));
        }

        let base = location
            .parent()
            .and_then(|parent| parent.strip_prefix(&self.root).ok())
            .unwrap_or(Path::new(""));
        match self.resolve(base, target) {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(invalid(format!(
                "target escapes the destination: {}",
                target.display()
            ))),
            Err(e) => Err(invalid(format!("{}: {e}", target.display()))),
        }
    }
}

/// Drop `strip` leading components. `None` when nothing remains.
fn strip_path(path: &Path, strip: usize, uri: &str) -> NodeEngineResult<Option<PathBuf>> {
    let components: Vec<Component<'_>> = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    let mut relative = PathBuf::new();
    for component in components.into_iter().skip(strip) {
        match component {
            Component::Normal(part) => relative.push(part),
            _ => {
                return Err(NodeEngineError::ArchiveFormat {
                    uri: uri.to_string(),
                    reason: format!("entry {} escapes the destination", path.display()),
                })
            }
        }
    }

    Ok((!relative.as_os_str().is_empty()).then_some(relative))
}

/// Remove a file or symlink left by an earlier entry at the same path
fn clear_entry(path: &Path) -> NodeEngineResult<()> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if !meta.is_dir() => std::fs::remove_file(path)
            .map_err(|e| NodeEngineError::io(format!("removing {}", path.display()), e)),
        _ => Ok(()),
    }
}

fn create_dir(dir: &Path) -> NodeEngineResult<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| NodeEngineError::io(format!("creating {}", dir.display()), e))
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> NodeEngineResult<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(mode & 0o7777))
        .map_err(|e| NodeEngineError::io(format!("setting mode on {}", path.display()), e))
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) -> NodeEngineResult<()> {
    Ok(())
}

#[cfg(unix)]
fn make_symlink(link: &Path, target: &Path) -> NodeEngineResult<()> {
    std::os::unix::fs::symlink(link, target).map_err(|e| NodeEngineError::Symlink {
        path: target.to_path_buf(),
        reason: e.to_string(),
    })
}

#[cfg(not(unix))]
fn make_symlink(_link: &Path, target: &Path) -> NodeEngineResult<()> {
    Err(NodeEngineError::Symlink {
        path: target.to_path_buf(),
        reason: "symlinks are not supported on this platform".to_string(),
    })
}

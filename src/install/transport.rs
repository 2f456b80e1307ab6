//! Artifact transport
//!
//! Opens a byte stream for a dependency URI. `file://` URIs are resolved
//! against the buildpack directory so catalogs can ship offline artifacts.

use crate::error::{NodeEngineError, NodeEngineResult};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

const FILE_SCHEME: &str = "file://";

/// Opens artifact streams
pub trait Transport {
    /// Open `uri`, resolving local paths against `root`
    fn fetch(&self, root: &Path, uri: &str) -> NodeEngineResult<Box<dyn Read>>;
}

/// `file://` from disk, `http(s)://` via a single blocking GET
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultTransport;

impl Transport for DefaultTransport {
    fn fetch(&self, root: &Path, uri: &str) -> NodeEngineResult<Box<dyn Read>> {
        if let Some(path) = uri.strip_prefix(FILE_SCHEME) {
            let full = local_path(root, path);
            debug!("Opening local artifact {}", full.display());
            let file = File::open(&full).map_err(|e| NodeEngineError::fetch(uri, e))?;
            return Ok(Box::new(file));
        }

        if uri.starts_with("http://") || uri.starts_with("https://") {
            debug!("Downloading {}", uri);
            let response = ureq::get(uri)
                .call()
                .map_err(|e| NodeEngineError::fetch(uri, e))?;
            return Ok(Box::new(response.into_body().into_reader()));
        }

        Err(NodeEngineError::fetch(uri, "unsupported URI scheme"))
    }
}

/// `file:///x` and `file://x` both mean `<root>/x`
fn local_path(root: &Path, path: &str) -> PathBuf {
    root.join(path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn read_all(mut reader: Box<dyn Read>) -> String {
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn file_uri_is_relative_to_root() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("deps")).unwrap();
        std::fs::write(temp.path().join("deps/node.tgz"), "payload").unwrap();

        let reader = DefaultTransport
            .fetch(temp.path(), "file://deps/node.tgz")
            .unwrap();
        assert_eq!(read_all(reader), "payload");

        let reader = DefaultTransport
            .fetch(temp.path(), "file:///deps/node.tgz")
            .unwrap();
        assert_eq!(read_all(reader), "payload");
    }

    #[test]
    fn missing_file_is_a_fetch_error() {
        let temp = TempDir::new().unwrap();
        let result = DefaultTransport.fetch(temp.path(), "file://missing.tgz");
        assert!(matches!(result, Err(NodeEngineError::Fetch { .. })));
    }

    #[test]
    fn unknown_scheme_is_a_fetch_error() {
        let temp = TempDir::new().unwrap();
        let result = DefaultTransport.fetch(temp.path(), "ftp://example.com/node.tgz");
        match result {
            Err(NodeEngineError::Fetch { uri, .. }) => assert_eq!(uri, "ftp://example.com/node.tgz"),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected an error"),
        }
    }
}

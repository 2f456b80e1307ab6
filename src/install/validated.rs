//! Checksum-validating reader
//!
//! Hashes every byte that passes through. After the consumer is done,
//! [`ValidatedReader::finish`] drains whatever is left and compares the
//! digest with the expected value.

use sha2::{Digest, Sha256};
use std::io::{self, Read};

/// Algorithm prefix accepted on expected checksums
const SHA256_PREFIX: &str = "sha256:";

/// A reader that computes the SHA-256 of everything read through it
pub struct ValidatedReader<R> {
    inner: R,
    hasher: Sha256,
    expected: String,
}

/// Result of draining a [`ValidatedReader`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest256 {
    pub expected: String,
    pub actual: String,
}

impl Digest256 {
    /// Exact, case-sensitive comparison
    pub fn is_valid(&self) -> bool {
        self.expected == self.actual
    }
}

impl<R: Read> ValidatedReader<R> {
    pub fn new(inner: R, expected: &str) -> Self {
        let expected = expected
            .strip_prefix(SHA256_PREFIX)
            .unwrap_or(expected)
            .to_string();
        Self {
            inner,
            hasher: Sha256::new(),
            expected,
        }
    }

    /// Drain the rest of the stream and return both digests
    pub fn finish(mut self) -> io::Result<Digest256> {
        io::copy(&mut self, &mut io::sink())?;
        Ok(Digest256 {
            expected: self.expected,
            actual: hex::encode(self.hasher.finalize()),
        })
    }
}

impl<R: Read> Read for ValidatedReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}

//! Content checksums for deployed and downloaded artifacts.
//!
//! The repository server identifies content by SHA-1 and MD5. Both digests
//! are computed in a single streaming pass so large artifacts are never
//! buffered in memory.

use std::fmt;
use std::io::Read;
use std::path::Path;

use md5::Md5;
use serde::Serialize;
use sha1::{Digest, Sha1};

/// Read buffer used while digesting.
const BUFFER_SIZE: usize = 8192;

/// Errors produced by the checksum crate.
#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid {algorithm} checksum '{value}'")]
    Invalid {
        algorithm: ChecksumAlgorithm,
        value: String,
    },
}

/// Digest algorithms understood by the repository server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChecksumAlgorithm {
    Md5,
    Sha1,
}

impl ChecksumAlgorithm {
    /// All algorithms, in the order companion files are fetched.
    pub const ALL: [ChecksumAlgorithm; 2] = [ChecksumAlgorithm::Md5, ChecksumAlgorithm::Sha1];

    /// Companion file extension, without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Md5 => "md5",
            Self::Sha1 => "sha1",
        }
    }

    /// Request header carrying the expected digest.
    pub fn header_name(self) -> &'static str {
        match self {
            Self::Md5 => "X-Checksum-Md5",
            Self::Sha1 => "X-Checksum-Sha1",
        }
    }

    /// Length of the hex-encoded digest.
    pub fn hex_len(self) -> usize {
        match self {
            Self::Md5 => 32,
            Self::Sha1 => 40,
        }
    }

    /// Checks that `value` is a well-formed digest for this algorithm.
    pub fn validate(self, value: &str) -> Result<(), ChecksumError> {
        let well_formed =
            value.len() == self.hex_len() && value.bytes().all(|b| b.is_ascii_hexdigit());
        if well_formed {
            Ok(())
        } else {
            Err(ChecksumError::Invalid {
                algorithm: self,
                value: value.to_string(),
            })
        }
    }
}

impl fmt::Display for ChecksumAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Md5 => f.write_str("MD5"),
            Self::Sha1 => f.write_str("SHA-1"),
        }
    }
}

/// SHA-1 and MD5 digests of one piece of content, lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Checksums {
    sha1: String,
    md5: String,
}

impl Checksums {
    /// Creates checksums from known values, validating their shape.
    pub fn new(sha1: impl Into<String>, md5: impl Into<String>) -> Result<Self, ChecksumError> {
        let sha1 = sha1.into().to_ascii_lowercase();
        let md5 = md5.into().to_ascii_lowercase();
        ChecksumAlgorithm::Sha1.validate(&sha1)?;
        ChecksumAlgorithm::Md5.validate(&md5)?;
        Ok(Self { sha1, md5 })
    }

    /// Digests an in-memory buffer.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut digester = Digester::default();
        digester.update(data);
        digester.finish()
    }

    /// Digests a file on disk.
    pub fn from_file(path: &Path) -> Result<Self, ChecksumError> {
        let file = std::fs::File::open(path)?;
        Ok(digest_all(file)?)
    }

    pub fn sha1(&self) -> &str {
        &self.sha1
    }

    pub fn md5(&self) -> &str {
        &self.md5
    }

    /// Digest for the given algorithm.
    pub fn get(&self, algorithm: ChecksumAlgorithm) -> &str {
        match algorithm {
            ChecksumAlgorithm::Md5 => &self.md5,
            ChecksumAlgorithm::Sha1 => &self.sha1,
        }
    }
}

/// Streams `reader` through SHA-1 and MD5 in one pass.
pub fn digest_all<R: Read>(mut reader: R) -> std::io::Result<Checksums> {
    let mut digester = Digester::default();
    let mut buf = [0u8; BUFFER_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        digester.update(&buf[..n]);
    }
    Ok(digester.finish())
}

/// Returns `true` if `path` names a checksum companion file.
pub fn is_checksum_file(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    ChecksumAlgorithm::ALL
        .iter()
        .any(|algorithm| lower.ends_with(&format!(".{}", algorithm.extension())))
}

#[derive(Default)]
struct Digester {
    sha1: Sha1,
    md5: Md5,
}

impl Digester {
    fn update(&mut self, data: &[u8]) {
        self.sha1.update(data);
        self.md5.update(data);
    }

    fn finish(self) -> Checksums {
        Checksums {
            sha1: hex::encode(self.sha1.finalize()),
            md5: hex::encode(self.md5.finalize()),
        }
    }
}

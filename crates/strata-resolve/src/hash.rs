//! Content digests
//!
//! SHA-2 digests of module content, hex-encoded.

use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Unrecognised algorithm name
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unsupported hash algorithm: {0}")]
pub struct UnknownAlgorithm(pub String);

/// Digest algorithm used for dependency hashes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum HashAlgorithm {
    #[default]
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    /// Canonical name, as written into hash records
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "SHA-256",
            HashAlgorithm::Sha512 => "SHA-512",
        }
    }

    /// Digest a byte slice
    pub fn digest(&self, bytes: &[u8]) -> String {
        match self {
            HashAlgorithm::Sha256 => hex::encode(Sha256::digest(bytes)),
            HashAlgorithm::Sha512 => hex::encode(Sha512::digest(bytes)),
        }
    }

    /// Digest a directory tree
    ///
    /// Files are fed in sorted relative-path order as `path NUL contents`, so the
    /// result does not depend on directory iteration order.
    pub fn digest_dir(&self, root: &Path) -> io::Result<String> {
        let mut files = Vec::new();
        collect_files(root, root, &mut files)?;
        files.sort();

        match self {
            HashAlgorithm::Sha256 => digest_files::<Sha256>(root, &files),
            HashAlgorithm::Sha512 => digest_files::<Sha512>(root, &files),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "").as_str() {
            "SHA256" => Ok(HashAlgorithm::Sha256),
            "SHA512" => Ok(HashAlgorithm::Sha512),
            _ => Err(UnknownAlgorithm(s.to_string())),
        }
    }
}

fn digest_files<D: Digest>(root: &Path, files: &[PathBuf]) -> io::Result<String> {
    let mut hasher = D::new();
    for relative in files {
        // Separators are normalised so the digest is the same on every platform
        let key = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        hasher.update(key.as_bytes());
        hasher.update([0u8]);
        hasher.update(fs::read(root.join(relative))?);
    }
    Ok(hex::encode(hasher.finalize()))
}

fn collect_files(root: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            collect_files(root, &path, out)?;
        } else if file_type.is_file() {
            if let Ok(relative) = path.strip_prefix(root) {
                out.push(relative.to_path_buf());
            }
        }
    }
    Ok(())
}

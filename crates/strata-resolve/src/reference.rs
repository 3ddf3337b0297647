//! Module references
//!
//! A located, openable handle to a module: its descriptor, where it was
//! found, and a lazily computed content hash.

use crate::descriptor::ModuleDescriptor;
use crate::hash::HashAlgorithm;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors computing a content hash
#[derive(Debug, Error)]
pub enum HashError {
    /// The reference has no content that can be hashed
    #[error("No content available to hash module {0}")]
    Unavailable(String),

    /// Reading the content failed
    #[error("Failed to read content of module {module}: {source}")]
    Io {
        module: String,
        #[source]
        source: io::Error,
    },
}

/// Where a module's bytes live
#[derive(Debug, Clone)]
pub enum ModuleContent {
    /// Nothing to hash, e.g. a descriptor-only reference
    None,

    /// Content held in memory
    Bytes(Arc<[u8]>),

    /// Exploded module directory
    Directory(PathBuf),
}

#[derive(Debug)]
struct ReferenceInner {
    descriptor: ModuleDescriptor,
    location: String,
    content: ModuleContent,
    // algorithm -> hex digest
    hashes: Mutex<HashMap<HashAlgorithm, String>>,
}

/// A module descriptor together with its location
///
/// Cloning is cheap; clones share the hash cache. Two references are equal when
/// their descriptors and locations are equal.
#[derive(Debug, Clone)]
pub struct ModuleReference {
    inner: Arc<ReferenceInner>,
}

impl ModuleReference {
    /// Create a reference with no hashable content
    pub fn new(descriptor: ModuleDescriptor, location: impl Into<String>) -> Self {
        Self::with_content(descriptor, location, ModuleContent::None)
    }

    pub fn with_content(
        descriptor: ModuleDescriptor,
        location: impl Into<String>,
        content: ModuleContent,
    ) -> Self {
        Self {
            inner: Arc::new(ReferenceInner {
                descriptor,
                location: location.into(),
                content,
                hashes: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Reference backed by in-memory bytes
    pub fn from_bytes(
        descriptor: ModuleDescriptor,
        location: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self::with_content(descriptor, location, ModuleContent::Bytes(bytes.into()))
    }

    pub fn descriptor(&self) -> &ModuleDescriptor {
        &self.inner.descriptor
    }

    /// Shorthand for `descriptor().name()`
    pub fn name(&self) -> &str {
        self.inner.descriptor.name()
    }

    pub fn location(&self) -> &str {
        &self.inner.location
    }

    pub fn content(&self) -> &ModuleContent {
        &self.inner.content
    }

    /// Compute (or return the cached) hash of the module content
    ///
    /// Two threads computing the first hash at once both do the work; the
    /// results are identical, so whichever lands in the cache is fine.
    pub fn compute_hash(&self, algorithm: HashAlgorithm) -> Result<String, HashError> {
        if let Some(hash) = self.inner.hashes.lock().get(&algorithm) {
            return Ok(hash.clone());
        }

        let hash = match &self.inner.content {
            ModuleContent::None => return Err(HashError::Unavailable(self.name().to_string())),
            ModuleContent::Bytes(bytes) => algorithm.digest(bytes),
            ModuleContent::Directory(dir) => {
                algorithm.digest_dir(dir).map_err(|source| HashError::Io {
                    module: self.name().to_string(),
                    source,
                })?
            }
        };

        self.inner
            .hashes
            .lock()
            .entry(algorithm)
            .or_insert_with(|| hash.clone());
        Ok(hash)
    }
}

impl PartialEq for ModuleReference {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.inner.location == other.inner.location
                && self.inner.descriptor == other.inner.descriptor)
    }
}

impl Eq for ModuleReference {}

impl Hash for ModuleReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
        self.inner.location.hash(state);
    }
}

//! Module finders
//!
//! A finder locates module references by name. Implementations must present a
//! stable view for the duration of a resolution: the same name always yields
//! the same reference, and every reference returned by [`ModuleFinder::find`]
//! is also part of [`ModuleFinder::find_all`].

mod module_path;

pub use module_path::{automatic_module_name, ModulePathFinder, MODULE_MANIFEST};

use crate::manifest::ManifestError;
use crate::reference::ModuleReference;
use indexmap::IndexMap;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use thiserror::Error;

/// Errors raised by a finder while locating modules
#[derive(Debug, Error)]
pub enum FinderError {
    /// I/O failure while scanning
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A module manifest could not be read
    #[error("Bad module manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: ManifestError,
    },

    /// Two modules with the same name in one location
    #[error("Two versions of module {name} found: {first} and {second}")]
    DuplicateModule {
        name: String,
        first: String,
        second: String,
    },

    /// Content that cannot be turned into a module
    #[error("Unable to derive a module from {path}: {reason}")]
    InvalidModule { path: PathBuf, reason: String },
}

/// Locates modules by name
pub trait ModuleFinder {
    /// Find the module with the given name, if this finder can locate it
    fn find(&self, name: &str) -> Result<Option<ModuleReference>, FinderError>;

    /// Every module this finder can locate
    fn find_all(&self) -> Result<Vec<ModuleReference>, FinderError>;
}

/// A finder that never finds anything
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyFinder;

impl ModuleFinder for EmptyFinder {
    fn find(&self, _name: &str) -> Result<Option<ModuleReference>, FinderError> {
        Ok(None)
    }

    fn find_all(&self) -> Result<Vec<ModuleReference>, FinderError> {
        Ok(Vec::new())
    }
}

/// Finder over a fixed set of references
#[derive(Debug, Clone, Default)]
pub struct StaticFinder {
    modules: IndexMap<String, ModuleReference>,
}

impl StaticFinder {
    /// Create a finder over the given references
    ///
    /// Fails if two references share a module name.
    pub fn new(references: impl IntoIterator<Item = ModuleReference>) -> Result<Self, FinderError> {
        let mut modules: IndexMap<String, ModuleReference> = IndexMap::new();
        for reference in references {
            if let Some(existing) = modules.get(reference.name()) {
                return Err(FinderError::DuplicateModule {
                    name: reference.name().to_string(),
                    first: existing.location().to_string(),
                    second: reference.location().to_string(),
                });
            }
            modules.insert(reference.name().to_string(), reference);
        }
        Ok(Self { modules })
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleFinder for StaticFinder {
    fn find(&self, name: &str) -> Result<Option<ModuleReference>, FinderError> {
        Ok(self.modules.get(name).cloned())
    }

    fn find_all(&self) -> Result<Vec<ModuleReference>, FinderError> {
        Ok(self.modules.values().cloned().collect())
    }
}

/// Concatenation of finders; the first finder that knows a name wins
#[derive(Clone, Default)]
pub struct ChainFinder {
    finders: Vec<Rc<dyn ModuleFinder>>,
}

impl ChainFinder {
    pub fn new(finders: impl IntoIterator<Item = Rc<dyn ModuleFinder>>) -> Self {
        Self {
            finders: finders.into_iter().collect(),
        }
    }
}

impl ModuleFinder for ChainFinder {
    fn find(&self, name: &str) -> Result<Option<ModuleReference>, FinderError> {
        for finder in &self.finders {
            if let Some(reference) = finder.find(name)? {
                return Ok(Some(reference));
            }
        }
        Ok(None)
    }

    fn find_all(&self) -> Result<Vec<ModuleReference>, FinderError> {
        let mut all: IndexMap<String, ModuleReference> = IndexMap::new();
        for finder in &self.finders {
            for reference in finder.find_all()? {
                all.entry(reference.name().to_string()).or_insert(reference);
            }
        }
        Ok(all.into_values().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ModuleDescriptor;

    fn reference(name: &str, location: &str) -> ModuleReference {
        ModuleReference::new(ModuleDescriptor::builder(name).build().unwrap(), location)
    }

    #[test]
    fn test_static_finder_find_and_find_all_agree() {
        let finder =
            StaticFinder::new(vec![reference("a", "mem:/a"), reference("b", "mem:/b")]).unwrap();

        let all = finder.find_all().unwrap();
        for name in ["a", "b"] {
            let found = finder.find(name).unwrap().unwrap();
            assert!(all.contains(&found));
        }
        assert!(finder.find("c").unwrap().is_none());
        assert_eq!(finder.len(), 2);
    }

    #[test]
    fn test_static_finder_rejects_duplicates() {
        let result = StaticFinder::new(vec![reference("a", "mem:/1"), reference("a", "mem:/2")]);
        assert!(matches!(result, Err(FinderError::DuplicateModule { name, .. }) if name == "a"));
    }

    #[test]
    fn test_empty_finder() {
        assert!(EmptyFinder.find("a").unwrap().is_none());
        assert!(EmptyFinder.find_all().unwrap().is_empty());
    }

    #[test]
    fn test_chain_finder_first_wins() {
        let first: Rc<dyn ModuleFinder> =
            Rc::new(StaticFinder::new(vec![reference("a", "mem:/first")]).unwrap());
        let second: Rc<dyn ModuleFinder> = Rc::new(
            StaticFinder::new(vec![reference("a", "mem:/second"), reference("b", "mem:/b")])
                .unwrap(),
        );
        let chain = ChainFinder::new(vec![first, second]);

        assert_eq!(chain.find("a").unwrap().unwrap().location(), "mem:/first");
        assert_eq!(chain.find("b").unwrap().unwrap().location(), "mem:/b");

        let all = chain.find_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].location(), "mem:/first");
    }
}

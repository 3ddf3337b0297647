//! Module resolution
//!
//! Computes the transitive closure of `requires` edges from a set of roots,
//! then validates the result and derives its readability graph:
//!
//! 1. worklist closure over `requires` (this module)
//! 2. cycle detection ([`cycles`])
//! 3. dependency hash verification ([`hashes`])
//! 4. readability graph with `requires public` propagation ([`readability`])
//! 5. exported package conflicts ([`exports`])
//!
//! Service binding ([`binder`]) reuses the same worklist and validation steps.

mod binder;
mod cycles;
mod exports;
mod hashes;
mod readability;

pub(crate) use binder::bind_services;
pub use hashes::{record_hashes, rehash_dependences};

use crate::configuration::Configuration;
use crate::descriptor::is_legal_name;
use crate::error::ResolutionError;
use crate::finder::ModuleFinder;
use crate::reference::ModuleReference;
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

/// Module -> modules it reads
pub(crate) type ReadsGraph = FxHashMap<ModuleReference, FxHashSet<ModuleReference>>;

/// Modules selected by a resolution, keyed by name, in discovery order
pub(crate) type Selection = IndexMap<String, ModuleReference>;

/// Outcome of a successful lookup
enum Lookup {
    /// Located by one of the finders
    Found(ModuleReference),

    /// Already supplied by an ancestor configuration
    InParent,

    Missing,
}

/// A validated selection and its readability graph
pub(crate) struct Resolution {
    pub selected: Selection,
    pub reads: ReadsGraph,
}

/// Resolution state for one `resolve` or `bind` call
///
/// Holds only borrowed collaborators and the growing selection; it is consumed
/// by [`Resolver::finish`], so nothing survives between calls.
pub(crate) struct Resolver<'a> {
    before: &'a dyn ModuleFinder,
    parent: Option<&'a Configuration>,
    after: &'a dyn ModuleFinder,
    selected: Selection,
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(
        before: &'a dyn ModuleFinder,
        parent: Option<&'a Configuration>,
        after: &'a dyn ModuleFinder,
    ) -> Self {
        Self::with_selection(before, parent, after, Selection::default())
    }

    /// Continue from an existing selection (used when binding)
    pub(crate) fn with_selection(
        before: &'a dyn ModuleFinder,
        parent: Option<&'a Configuration>,
        after: &'a dyn ModuleFinder,
        selected: Selection,
    ) -> Self {
        Self {
            before,
            parent,
            after,
            selected,
        }
    }

    /// Select the roots and everything they transitively require
    pub(crate) fn resolve_roots(&mut self, roots: &[String]) -> Result<(), ResolutionError> {
        if roots.is_empty() {
            return Err(ResolutionError::NoRoots);
        }

        let mut worklist = Vec::new();
        for root in roots {
            if !is_legal_name(root) {
                return Err(ResolutionError::InvalidRoot(root.clone()));
            }
            if self.selected.contains_key(root) {
                continue;
            }
            match self.lookup(root)? {
                Lookup::Found(reference) => {
                    tracing::debug!(module = %root, location = %reference.location(), "selected root");
                    self.selected.insert(root.clone(), reference.clone());
                    worklist.push(reference);
                }
                Lookup::InParent => {
                    tracing::debug!(module = %root, "root supplied by parent configuration");
                }
                Lookup::Missing => {
                    return Err(ResolutionError::ModuleNotFound {
                        module: root.clone(),
                        required_by: None,
                    });
                }
            }
        }

        self.drain(worklist)?;
        Ok(())
    }

    /// Process the worklist until empty
    ///
    /// Every module on the worklist must already be selected. Returns the
    /// modules newly selected while following their `requires` edges.
    pub(crate) fn drain(
        &mut self,
        mut worklist: Vec<ModuleReference>,
    ) -> Result<Vec<ModuleReference>, ResolutionError> {
        let mut added = Vec::new();

        while let Some(module) = worklist.pop() {
            for requires in module.descriptor().requires() {
                let name = requires.name();
                if self.selected.contains_key(name) {
                    continue;
                }
                match self.lookup(name)? {
                    Lookup::Found(reference) => {
                        tracing::debug!(
                            module = %name,
                            required_by = %module.name(),
                            location = %reference.location(),
                            "selected module"
                        );
                        self.selected.insert(name.to_string(), reference.clone());
                        added.push(reference.clone());
                        worklist.push(reference);
                    }
                    Lookup::InParent => {}
                    Lookup::Missing => {
                        return Err(ResolutionError::ModuleNotFound {
                            module: name.to_string(),
                            required_by: Some(module.name().to_string()),
                        });
                    }
                }
            }
        }

        Ok(added)
    }

    /// Locate a module: before-finder, then the parent chain, then after-finder
    fn lookup(&self, name: &str) -> Result<Lookup, ResolutionError> {
        if let Some(reference) = self.before.find(name)? {
            return Ok(Lookup::Found(reference));
        }
        if self.parent.and_then(|p| p.find_module(name)).is_some() {
            return Ok(Lookup::InParent);
        }
        match self.after.find(name)? {
            Some(reference) => Ok(Lookup::Found(reference)),
            None => Ok(Lookup::Missing),
        }
    }

    /// Validate the selection and build its readability graph
    pub(crate) fn finish(self) -> Result<Resolution, ResolutionError> {
        cycles::detect_cycles(&self.selected)?;
        hashes::check_hashes(&self.selected, self.parent)?;
        let reads = readability::make_graph(&self.selected, self.parent);
        exports::check_export_suppliers(&self.selected, &reads)?;

        Ok(Resolution {
            selected: self.selected,
            reads,
        })
    }
}

/// Look a name up in the selection first, then in the parent chain
pub(crate) fn resolve_target<'s>(
    selected: &'s Selection,
    parent: Option<&'s Configuration>,
    name: &str,
) -> Option<&'s ModuleReference> {
    selected
        .get(name)
        .or_else(|| parent.and_then(|p| p.find_module(name)))
}

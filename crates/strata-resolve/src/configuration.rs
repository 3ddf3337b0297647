//! Resolved configurations
//!
//! A configuration is the immutable result of a resolution: the selected
//! modules, the readability graph between them, and the parent configuration
//! it was resolved on top of. Configurations form a chain of layers; several
//! children may share one parent, so the chain is reference counted.

use crate::descriptor::ModuleDescriptor;
use crate::error::ResolutionError;
use crate::finder::{EmptyFinder, ModuleFinder};
use crate::reference::ModuleReference;
use crate::resolver::{bind_services, ReadsGraph, Resolver, Selection};
use std::fmt;
use std::rc::Rc;

/// The resolved, validated set of modules of one layer
pub struct Configuration {
    parent: Option<Rc<Configuration>>,
    before: Rc<dyn ModuleFinder>,
    after: Rc<dyn ModuleFinder>,
    roots: Vec<String>,
    selected: Selection,
    reads: ReadsGraph,
}

impl Configuration {
    /// The empty configuration, usable as the root of a layer chain
    pub fn empty() -> Rc<Configuration> {
        Rc::new(Configuration {
            parent: None,
            before: Rc::new(EmptyFinder),
            after: Rc::new(EmptyFinder),
            roots: Vec::new(),
            selected: Selection::default(),
            reads: ReadsGraph::default(),
        })
    }

    /// Resolve `roots` into a new configuration
    ///
    /// Names are looked up in `before` first, then in `parent` and its
    /// ancestors, then in `after`. A module supplied by an ancestor is not
    /// selected again and its dependences are not followed.
    pub fn resolve<I, S>(
        before: Rc<dyn ModuleFinder>,
        parent: Option<Rc<Configuration>>,
        after: Rc<dyn ModuleFinder>,
        roots: I,
    ) -> Result<Rc<Configuration>, ResolutionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let roots: Vec<String> = roots.into_iter().map(Into::into).collect();

        let mut resolver = Resolver::new(&*before, parent.as_deref(), &*after);
        resolver.resolve_roots(&roots)?;
        let resolution = resolver.finish()?;

        tracing::info!(
            roots = ?roots,
            modules = resolution.selected.len(),
            "resolved configuration"
        );

        Ok(Rc::new(Configuration {
            parent,
            before,
            after,
            roots,
            selected: resolution.selected,
            reads: resolution.reads,
        }))
    }

    /// Add the providers of every used service, transitively
    ///
    /// Uses the finders this configuration was resolved with. If no provider
    /// needs adding the same configuration is returned.
    pub fn bind(self: &Rc<Self>) -> Result<Rc<Configuration>, ResolutionError> {
        let mut resolver = Resolver::with_selection(
            &*self.before,
            self.parent.as_deref(),
            &*self.after,
            self.selected.clone(),
        );

        let added = bind_services(&mut resolver)?;
        if added == 0 {
            tracing::debug!("no service providers to bind");
            return Ok(Rc::clone(self));
        }

        let resolution = resolver.finish()?;
        tracing::info!(
            added,
            modules = resolution.selected.len(),
            "bound service providers"
        );

        Ok(Rc::new(Configuration {
            parent: self.parent.clone(),
            before: Rc::clone(&self.before),
            after: Rc::clone(&self.after),
            roots: self.roots.clone(),
            selected: resolution.selected,
            reads: resolution.reads,
        }))
    }

    pub fn parent(&self) -> Option<&Rc<Configuration>> {
        self.parent.as_ref()
    }

    /// Ancestor configurations, nearest first
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors {
            next: self.parent.as_deref(),
        }
    }

    /// Root names this configuration was resolved from
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Modules of this layer, in the order they were selected
    pub fn modules(&self) -> impl Iterator<Item = &ModuleReference> {
        self.selected.values()
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Find a module by name in this layer or, failing that, its ancestors
    pub fn find_module(&self, name: &str) -> Option<&ModuleReference> {
        if let Some(reference) = self.selected.get(name) {
            return Some(reference);
        }
        self.ancestors().find_map(|layer| layer.selected.get(name))
    }

    /// Descriptors of this layer's modules
    pub fn descriptors(&self) -> Vec<&ModuleDescriptor> {
        self.selected.values().map(ModuleReference::descriptor).collect()
    }

    /// Descriptor of a module selected in this layer
    pub fn find_descriptor(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.selected.get(name).map(ModuleReference::descriptor)
    }

    /// Modules read by the named module, ordered by name
    ///
    /// Returns `None` if the module is not selected in this layer.
    pub fn reads(&self, name: &str) -> Option<Vec<&ModuleReference>> {
        let module = self.selected.get(name)?;
        let mut reads: Vec<&ModuleReference> = self.reads.get(module)?.iter().collect();
        reads.sort_by(|a, b| (a.name(), a.location()).cmp(&(b.name(), b.location())));
        Some(reads)
    }

    /// Descriptors of the modules the given module reads
    ///
    /// Fails with [`ResolutionError::UnknownModule`] if the descriptor is not
    /// one of this layer's modules.
    pub fn read_dependences(
        &self,
        descriptor: &ModuleDescriptor,
    ) -> Result<Vec<&ModuleDescriptor>, ResolutionError> {
        let unknown = || ResolutionError::UnknownModule(descriptor.name().to_string());
        match self.selected.get(descriptor.name()) {
            Some(module) if module.descriptor() == descriptor => {}
            _ => return Err(unknown()),
        }
        let reads = self.reads(descriptor.name()).ok_or_else(unknown)?;
        Ok(reads.into_iter().map(ModuleReference::descriptor).collect())
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("roots", &self.roots)
            .field("modules", &self.selected.keys().collect::<Vec<_>>())
            .field("parent", &self.parent)
            .finish()
    }
}

/// Iterator over a configuration's ancestors
pub struct Ancestors<'a> {
    next: Option<&'a Configuration>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Configuration;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent.as_deref();
        Some(current)
    }
}

/// Resolve `roots` using the given finders and optional parent
///
/// See [`Configuration::resolve`].
pub fn resolve<I, S>(
    before: Rc<dyn ModuleFinder>,
    parent: Option<Rc<Configuration>>,
    after: Rc<dyn ModuleFinder>,
    roots: I,
) -> Result<Rc<Configuration>, ResolutionError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Configuration::resolve(before, parent, after, roots)
}

/// Bind service providers into a configuration
///
/// See [`Configuration::bind`].
pub fn bind(configuration: &Rc<Configuration>) -> Result<Rc<Configuration>, ResolutionError> {
    configuration.bind()
}

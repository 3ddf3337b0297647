//! Module descriptors
//!
//! The declared contract of one module: what it requires, which packages it
//! exports and to whom, which services it uses or provides, and optionally the
//! hashes it recorded for its dependencies.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// Errors raised while building a descriptor
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DescriptorError {
    /// Module name is not a legal identifier
    #[error("Invalid module name: '{0}'")]
    InvalidName(String),

    /// Package or service name is not a legal identifier
    #[error("Invalid package name '{package}' in module {module}")]
    InvalidPackage { module: String, package: String },

    /// The same module is required twice
    #[error("Module {module} requires {dependency} more than once")]
    DuplicateRequires { module: String, dependency: String },

    /// The same package is exported twice
    #[error("Module {module} exports package {package} more than once")]
    DuplicateExports { module: String, package: String },

    /// A module requires itself
    #[error("Module {0} requires itself")]
    SelfRequires(String),
}

/// Modifier attached to a `requires` edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RequiresModifier {
    /// Readability propagates to modules that read the requiring module
    Public,

    /// Not present in source, added by a tool
    Synthetic,

    /// Implicitly declared
    Mandated,
}

impl fmt::Display for RequiresModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequiresModifier::Public => write!(f, "public"),
            RequiresModifier::Synthetic => write!(f, "synthetic"),
            RequiresModifier::Mandated => write!(f, "mandated"),
        }
    }
}

/// A dependence on another module, by name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Requires {
    name: String,
    modifiers: BTreeSet<RequiresModifier>,
}

impl Requires {
    /// Create a plain `requires` edge
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modifiers: BTreeSet::new(),
        }
    }

    /// Create a `requires` edge carrying the given modifiers
    pub fn with_modifiers(
        name: impl Into<String>,
        modifiers: impl IntoIterator<Item = RequiresModifier>,
    ) -> Self {
        Self {
            name: name.into(),
            modifiers: modifiers.into_iter().collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modifiers(&self) -> &BTreeSet<RequiresModifier> {
        &self.modifiers
    }

    /// Whether this is a `requires public` edge
    pub fn is_public(&self) -> bool {
        self.modifiers.contains(&RequiresModifier::Public)
    }
}

/// An exported package, optionally qualified to a set of target modules
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Exports {
    source: String,
    targets: Option<BTreeSet<String>>,
}

impl Exports {
    /// Unqualified export, visible to every reader
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            targets: None,
        }
    }

    /// Qualified export, visible only to the named modules
    pub fn qualified<I, S>(source: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source: source.into(),
            targets: Some(targets.into_iter().map(Into::into).collect()),
        }
    }

    /// The exported package
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn targets(&self) -> Option<&BTreeSet<String>> {
        self.targets.as_ref()
    }

    pub fn is_qualified(&self) -> bool {
        self.targets.is_some()
    }

    /// Whether a module with the given name can see this export
    pub fn is_visible_to(&self, module: &str) -> bool {
        match &self.targets {
            None => true,
            Some(targets) => targets.contains(module),
        }
    }
}

/// Hashes a module recorded for its dependencies at packaging time
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleHashes {
    algorithm: String,
    hashes: BTreeMap<String, String>,
}

impl ModuleHashes {
    pub fn new(algorithm: impl Into<String>, hashes: BTreeMap<String, String>) -> Self {
        Self {
            algorithm: algorithm.into(),
            hashes,
        }
    }

    /// Name of the digest algorithm, e.g. `SHA-256`
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Recorded hash for a dependency
    pub fn hash_for(&self, module: &str) -> Option<&str> {
        self.hashes.get(module).map(String::as_str)
    }

    /// Iterate over `(dependency, hash)` pairs, ordered by dependency name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.hashes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

/// The declared shape of a module
///
/// Built through [`ModuleDescriptor::builder`], which enforces the invariants the
/// resolver relies on: legal names, no duplicate `requires` or `exports` keys,
/// and every exported package listed in [`packages`](Self::packages).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    name: String,
    requires: BTreeSet<Requires>,
    exports: BTreeSet<Exports>,
    uses: BTreeSet<String>,
    provides: BTreeMap<String, Vec<String>>,
    packages: BTreeSet<String>,
    hashes: Option<ModuleHashes>,
    automatic: bool,
}

impl ModuleDescriptor {
    /// Start building a descriptor for the named module
    pub fn builder(name: impl Into<String>) -> ModuleDescriptorBuilder {
        ModuleDescriptorBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dependences, ordered by module name
    pub fn requires(&self) -> &BTreeSet<Requires> {
        &self.requires
    }

    pub fn exports(&self) -> &BTreeSet<Exports> {
        &self.exports
    }

    /// Service types this module consumes
    pub fn uses(&self) -> &BTreeSet<String> {
        &self.uses
    }

    /// Service type -> provider class names
    pub fn provides(&self) -> &BTreeMap<String, Vec<String>> {
        &self.provides
    }

    /// Every package in the module, exported or not
    pub fn packages(&self) -> &BTreeSet<String> {
        &self.packages
    }

    pub fn hashes(&self) -> Option<&ModuleHashes> {
        self.hashes.as_ref()
    }

    /// Whether this descriptor was synthesized for unstructured content
    pub fn is_automatic(&self) -> bool {
        self.automatic
    }
}

impl fmt::Display for ModuleDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "module {}", self.name)?;
        if self.automatic {
            write!(f, " (automatic)")?;
        }
        Ok(())
    }
}

/// Builder for [`ModuleDescriptor`]
#[derive(Debug, Clone)]
pub struct ModuleDescriptorBuilder {
    name: String,
    requires: Vec<Requires>,
    exports: Vec<Exports>,
    uses: BTreeSet<String>,
    provides: BTreeMap<String, Vec<String>>,
    packages: BTreeSet<String>,
    hashes: Option<ModuleHashes>,
    automatic: bool,
}

impl ModuleDescriptorBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requires: Vec::new(),
            exports: Vec::new(),
            uses: BTreeSet::new(),
            provides: BTreeMap::new(),
            packages: BTreeSet::new(),
            hashes: None,
            automatic: false,
        }
    }

    /// Add a plain `requires` edge
    pub fn requires(self, name: impl Into<String>) -> Self {
        self.requires_with(Requires::new(name))
    }

    /// Add a `requires public` edge
    pub fn requires_public(self, name: impl Into<String>) -> Self {
        self.requires_with(Requires::with_modifiers(name, [RequiresModifier::Public]))
    }

    pub fn requires_with(mut self, requires: Requires) -> Self {
        self.requires.push(requires);
        self
    }

    /// Export a package to every reader
    pub fn exports(self, package: impl Into<String>) -> Self {
        self.exports_with(Exports::new(package))
    }

    /// Export a package to the named modules only
    pub fn exports_to<I, S>(self, package: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exports_with(Exports::qualified(package, targets))
    }

    pub fn exports_with(mut self, exports: Exports) -> Self {
        self.exports.push(exports);
        self
    }

    pub fn uses(mut self, service: impl Into<String>) -> Self {
        self.uses.insert(service.into());
        self
    }

    pub fn provides<I, S>(mut self, service: impl Into<String>, providers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provides
            .entry(service.into())
            .or_default()
            .extend(providers.into_iter().map(Into::into));
        self
    }

    /// Add a (possibly non-exported) package
    pub fn package(mut self, package: impl Into<String>) -> Self {
        self.packages.insert(package.into());
        self
    }

    pub fn hashes(mut self, hashes: ModuleHashes) -> Self {
        self.hashes = Some(hashes);
        self
    }

    /// Mark the descriptor as synthesized for unstructured content
    pub fn automatic(mut self, automatic: bool) -> Self {
        self.automatic = automatic;
        self
    }

    /// Validate and build the descriptor
    pub fn build(self) -> Result<ModuleDescriptor, DescriptorError> {
        if !is_legal_name(&self.name) {
            return Err(DescriptorError::InvalidName(self.name));
        }

        let mut requires = BTreeSet::new();
        let mut required_names = BTreeSet::new();
        for req in self.requires {
            if !is_legal_name(req.name()) {
                return Err(DescriptorError::InvalidName(req.name().to_string()));
            }
            if req.name() == self.name {
                return Err(DescriptorError::SelfRequires(self.name));
            }
            if !required_names.insert(req.name().to_string()) {
                return Err(DescriptorError::DuplicateRequires {
                    module: self.name,
                    dependency: req.name().to_string(),
                });
            }
            requires.insert(req);
        }

        let mut packages = self.packages;
        let mut exports = BTreeSet::new();
        let mut exported = BTreeSet::new();
        for export in self.exports {
            if !exported.insert(export.source().to_string()) {
                return Err(DescriptorError::DuplicateExports {
                    module: self.name,
                    package: export.source().to_string(),
                });
            }
            packages.insert(export.source().to_string());
            exports.insert(export);
        }

        let services = self.uses.iter().chain(self.provides.keys());
        for package in packages.iter().chain(services) {
            if !is_legal_name(package) {
                return Err(DescriptorError::InvalidPackage {
                    module: self.name,
                    package: package.clone(),
                });
            }
        }

        Ok(ModuleDescriptor {
            name: self.name,
            requires,
            exports,
            uses: self.uses,
            provides: self.provides,
            packages,
            hashes: self.hashes,
            automatic: self.automatic,
        })
    }
}

/// Check that a module or package name is a legal dotted identifier
///
/// Each `.`-separated segment must start with an ASCII letter or `_` and
/// continue with ASCII letters, digits or `_`.
pub fn is_legal_name(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_legal_segment)
}

fn is_legal_segment(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_names() {
        assert!(is_legal_name("app"));
        assert!(is_legal_name("com.example.app"));
        assert!(is_legal_name("_internal.v2"));

        assert!(!is_legal_name(""));
        assert!(!is_legal_name("com..example"));
        assert!(!is_legal_name(".app"));
        assert!(!is_legal_name("app."));
        assert!(!is_legal_name("2fast"));
        assert!(!is_legal_name("my-module"));
    }

    #[test]
    fn test_build_descriptor() {
        let descriptor = ModuleDescriptor::builder("app")
            .requires("lib")
            .requires_public("base")
            .exports("app.api")
            .exports_to("app.friend", ["tests"])
            .package("app.internal")
            .uses("app.spi.Greeter")
            .provides("app.spi.Greeter", ["app.internal.English"])
            .build()
            .unwrap();

        assert_eq!(descriptor.name(), "app");
        let names: Vec<_> = descriptor.requires().iter().map(Requires::name).collect();
        assert_eq!(names, vec!["base", "lib"]);
        assert!(descriptor.requires().iter().any(|r| r.name() == "base" && r.is_public()));

        // Exported packages are always part of the package set
        assert!(descriptor.packages().contains("app.api"));
        assert!(descriptor.packages().contains("app.friend"));
        assert!(descriptor.packages().contains("app.internal"));
        assert!(!descriptor.is_automatic());
    }

    #[test]
    fn test_qualified_export_visibility() {
        let export = Exports::qualified("p", ["a", "b"]);
        assert!(export.is_qualified());
        assert!(export.is_visible_to("a"));
        assert!(!export.is_visible_to("c"));
        assert!(Exports::new("p").is_visible_to("anything"));
    }

    #[test]
    fn test_invalid_module_name() {
        let result = ModuleDescriptor::builder("not-a-name").build();
        assert_eq!(
            result,
            Err(DescriptorError::InvalidName("not-a-name".to_string()))
        );
    }

    #[test]
    fn test_duplicate_requires() {
        let result = ModuleDescriptor::builder("app")
            .requires("lib")
            .requires_public("lib")
            .build();
        assert!(matches!(result, Err(DescriptorError::DuplicateRequires { .. })));
    }

    #[test]
    fn test_duplicate_exports() {
        let result = ModuleDescriptor::builder("app")
            .exports("p")
            .exports_to("p", ["other"])
            .build();
        assert!(matches!(result, Err(DescriptorError::DuplicateExports { .. })));
    }

    #[test]
    fn test_self_requires() {
        let result = ModuleDescriptor::builder("app").requires("app").build();
        assert_eq!(result, Err(DescriptorError::SelfRequires("app".to_string())));
    }

    #[test]
    fn test_invalid_package() {
        let result = ModuleDescriptor::builder("app").package("bad-pkg").build();
        assert!(matches!(result, Err(DescriptorError::InvalidPackage { .. })));
    }

    #[test]
    fn test_module_hashes() {
        let mut map = BTreeMap::new();
        map.insert("lib".to_string(), "abcd".to_string());
        let hashes = ModuleHashes::new("SHA-256", map);

        assert_eq!(hashes.algorithm(), "SHA-256");
        assert_eq!(hashes.hash_for("lib"), Some("abcd"));
        assert_eq!(hashes.hash_for("other"), None);
        assert_eq!(hashes.len(), 1);
    }
}

//! Strata Module Resolution Library
//!
//! This crate resolves named modules into validated, layered configurations:
//! - Module descriptors (requires, exports, uses, provides, dependency hashes)
//! - Module manifests (module.toml)
//! - Module finders (in-memory, chained, module path directories)
//! - Resolution of root modules to their transitive `requires` closure
//! - Cycle, dependency hash and exported package validation
//! - Readability graphs with `requires public` propagation
//! - Service binding
//! - Resolution reports (TOML and JSON)
//!
//! A configuration is resolved with two finders and an optional parent:
//!
//! ```no_run
//! use std::rc::Rc;
//! use strata_resolve::{Configuration, EmptyFinder, ModulePathFinder};
//!
//! let finder = Rc::new(ModulePathFinder::new(["mods"]));
//! let cf = Configuration::resolve(Rc::new(EmptyFinder), None, finder, ["app"])?;
//! let cf = cf.bind()?;
//! for module in cf.modules() {
//!     println!("{} {}", module.name(), module.location());
//! }
//! # Ok::<(), strata_resolve::ResolutionError>(())
//! ```

pub mod configuration;
pub mod descriptor;
pub mod error;
pub mod finder;
pub mod hash;
pub mod manifest;
pub mod reference;
pub mod report;
pub mod resolver;

pub use configuration::{bind, resolve, Ancestors, Configuration};
pub use descriptor::{
    is_legal_name, DescriptorError, Exports, ModuleDescriptor, ModuleDescriptorBuilder,
    ModuleHashes, Requires, RequiresModifier,
};
pub use error::{ExportConflict, ResolutionError};
pub use finder::{
    automatic_module_name, ChainFinder, EmptyFinder, FinderError, ModuleFinder, ModulePathFinder,
    StaticFinder, MODULE_MANIFEST,
};
pub use hash::{HashAlgorithm, UnknownAlgorithm};
pub use manifest::{parse_descriptor, ManifestError, ModuleManifest};
pub use reference::{HashError, ModuleContent, ModuleReference};
pub use report::{ReportError, ReportFormat, ReportedModule, ResolutionReport, REPORT_VERSION};
pub use resolver::{record_hashes, rehash_dependences};

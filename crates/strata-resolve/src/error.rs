//! Resolution errors
//!
//! Every failure of `resolve` or `bind` is fatal to that call; no partial
//! configuration is ever returned.

use crate::finder::FinderError;
use std::io;
use thiserror::Error;

/// Errors that can occur during resolution and binding
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// No roots were given
    #[error("No root modules to resolve")]
    NoRoots,

    /// A root name is not a legal module name
    #[error("Invalid root module name: '{0}'")]
    InvalidRoot(String),

    /// A root or required module could not be located
    #[error("{}", not_found_message(.module, .required_by.as_deref()))]
    ModuleNotFound {
        module: String,
        required_by: Option<String>,
    },

    /// The requires graph of the newly resolved modules has a cycle
    #[error("Cycle detected: {0}")]
    CycleDetected(String),

    /// A recorded dependency hash does not match the dependency's content
    #[error("Hash of {dependency} ({actual}) differs to expected hash ({recorded}) recorded in {module}")]
    HashMismatch {
        module: String,
        dependency: String,
        recorded: String,
        actual: String,
    },

    /// A recorded dependency hash cannot be checked
    #[error("Unable to compute the hash of module {dependency} (recorded in {module}): {reason}")]
    HashUnavailable {
        module: String,
        dependency: String,
        reason: String,
    },

    /// Two suppliers of the same package are visible to one module
    #[error(transparent)]
    ExportConflict(#[from] ExportConflict),

    /// A descriptor was passed that is not part of the configuration
    #[error("Module {0} is not in this configuration")]
    UnknownModule(String),

    /// A finder failed while locating modules
    #[error("Error locating modules: {0}")]
    Finder(#[from] FinderError),

    /// Module content could not be read
    #[error("Error reading module {module}: {source}")]
    Io {
        module: String,
        #[source]
        source: io::Error,
    },
}

/// A package reaching a module from two places
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExportConflict {
    /// The module's own package is also exported to it by another module
    #[error("Module {module} contains package {package}, module {exporter} exports package {package} to {module}")]
    LocalPackage {
        module: String,
        package: String,
        exporter: String,
    },

    /// Two other modules export the same package to the module
    #[error("Modules {first} and {second} export package {package} to module {module}")]
    DuplicateSupplier {
        first: String,
        second: String,
        package: String,
        module: String,
    },
}

impl ExportConflict {
    /// The contested package
    pub fn package(&self) -> &str {
        match self {
            ExportConflict::LocalPackage { package, .. } => package,
            ExportConflict::DuplicateSupplier { package, .. } => package,
        }
    }

    /// The module that sees two suppliers
    pub fn module(&self) -> &str {
        match self {
            ExportConflict::LocalPackage { module, .. } => module,
            ExportConflict::DuplicateSupplier { module, .. } => module,
        }
    }
}

fn not_found_message(module: &str, required_by: Option<&str>) -> String {
    match required_by {
        Some(requirer) => format!("Module {} not found, required by {}", module, requirer),
        None => format!("Module {} not found", module),
    }
}

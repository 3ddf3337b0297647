//! Module manifest parsing (module.toml)
//!
//! Provides the on-disk form of a module descriptor.

use crate::descriptor::{
    DescriptorError, Exports, ModuleDescriptor, ModuleHashes, Requires, RequiresModifier,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during manifest parsing
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Failed to read manifest file
    #[error("Failed to read manifest file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse manifest: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to serialize manifest
    #[error("Failed to serialize manifest: {0}")]
    SerializeError(String),

    /// The manifest describes an invalid module
    #[error("Invalid manifest: {0}")]
    ValidationError(#[from] DescriptorError),
}

/// Module manifest (module.toml)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleManifest {
    /// Module declaration
    pub module: ModuleSection,

    /// Service type -> provider class names
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub provides: BTreeMap<String, Vec<String>>,

    /// Hashes recorded for dependencies
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hashes: Option<HashesSection>,
}

/// The `[module]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleSection {
    /// Module name (dotted identifier)
    pub name: String,

    /// Non-exported packages; exported packages need not be repeated here
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub packages: Vec<String>,

    /// Service types consumed by this module
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uses: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requires: Vec<RequiresSpec>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exports: Vec<ExportsSpec>,
}

/// Dependence specification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RequiresSpec {
    /// Plain dependence: "lib"
    Simple(String),

    /// Dependence with modifiers
    Detailed {
        name: String,

        #[serde(default, skip_serializing_if = "is_false")]
        public: bool,

        #[serde(default, skip_serializing_if = "is_false")]
        synthetic: bool,

        #[serde(default, skip_serializing_if = "is_false")]
        mandated: bool,
    },
}

/// Export specification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ExportsSpec {
    /// Unqualified export: "app.api"
    Simple(String),

    /// Export, optionally qualified to target modules
    Detailed {
        package: String,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        to: Option<Vec<String>>,
    },
}

/// The `[hashes]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HashesSection {
    /// Digest algorithm name, e.g. "SHA-256"
    pub algorithm: String,

    /// Dependency name -> hex digest
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ModuleManifest {
    /// Parse a manifest from a file
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse a manifest from a string
    pub fn from_str(content: &str) -> Result<Self, ManifestError> {
        let manifest: ModuleManifest = toml::from_str(content)?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Validate the manifest
    pub fn validate(&self) -> Result<(), ManifestError> {
        self.to_descriptor().map(|_| ())
    }

    /// Write manifest to a file
    pub fn to_file(&self, path: &Path) -> Result<(), ManifestError> {
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, ManifestError> {
        toml::to_string_pretty(self).map_err(|e| ManifestError::SerializeError(e.to_string()))
    }

    /// Build the descriptor this manifest declares
    pub fn to_descriptor(&self) -> Result<ModuleDescriptor, ManifestError> {
        let section = &self.module;
        let mut builder = ModuleDescriptor::builder(&section.name);

        for spec in &section.requires {
            builder = builder.requires_with(spec.to_requires());
        }
        for spec in &section.exports {
            builder = builder.exports_with(spec.to_exports());
        }
        for package in &section.packages {
            builder = builder.package(package);
        }
        for service in &section.uses {
            builder = builder.uses(service);
        }
        for (service, providers) in &self.provides {
            builder = builder.provides(service, providers);
        }
        if let Some(hashes) = &self.hashes {
            builder = builder.hashes(ModuleHashes::new(&hashes.algorithm, hashes.modules.clone()));
        }

        Ok(builder.build()?)
    }

    /// Produce the manifest for an existing descriptor
    pub fn from_descriptor(descriptor: &ModuleDescriptor) -> Self {
        let exported: Vec<&str> = descriptor.exports().iter().map(Exports::source).collect();

        let module = ModuleSection {
            name: descriptor.name().to_string(),
            packages: descriptor
                .packages()
                .iter()
                .filter(|p| !exported.contains(&p.as_str()))
                .cloned()
                .collect(),
            uses: descriptor.uses().iter().cloned().collect(),
            requires: descriptor.requires().iter().map(RequiresSpec::from).collect(),
            exports: descriptor.exports().iter().map(ExportsSpec::from).collect(),
        };

        let hashes = descriptor.hashes().map(|h| HashesSection {
            algorithm: h.algorithm().to_string(),
            modules: h.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
        });

        Self {
            module,
            provides: descriptor.provides().clone(),
            hashes,
        }
    }
}

impl RequiresSpec {
    /// Name of the required module
    pub fn name(&self) -> &str {
        match self {
            RequiresSpec::Simple(name) => name,
            RequiresSpec::Detailed { name, .. } => name,
        }
    }

    fn to_requires(&self) -> Requires {
        match self {
            RequiresSpec::Simple(name) => Requires::new(name.clone()),
            RequiresSpec::Detailed {
                name,
                public,
                synthetic,
                mandated,
            } => {
                let modifiers = [
                    (*public, RequiresModifier::Public),
                    (*synthetic, RequiresModifier::Synthetic),
                    (*mandated, RequiresModifier::Mandated),
                ];
                Requires::with_modifiers(
                    name.clone(),
                    modifiers.into_iter().filter(|(on, _)| *on).map(|(_, m)| m),
                )
            }
        }
    }
}

impl From<&Requires> for RequiresSpec {
    fn from(requires: &Requires) -> Self {
        if requires.modifiers().is_empty() {
            return RequiresSpec::Simple(requires.name().to_string());
        }
        let has = |m| requires.modifiers().contains(&m);
        RequiresSpec::Detailed {
            name: requires.name().to_string(),
            public: has(RequiresModifier::Public),
            synthetic: has(RequiresModifier::Synthetic),
            mandated: has(RequiresModifier::Mandated),
        }
    }
}

impl ExportsSpec {
    fn to_exports(&self) -> Exports {
        match self {
            ExportsSpec::Simple(package) => Exports::new(package.clone()),
            ExportsSpec::Detailed { package, to: None } => Exports::new(package.clone()),
            ExportsSpec::Detailed {
                package,
                to: Some(targets),
            } => Exports::qualified(package.clone(), targets.iter().cloned()),
        }
    }
}

impl From<&Exports> for ExportsSpec {
    fn from(exports: &Exports) -> Self {
        match exports.targets() {
            None => ExportsSpec::Simple(exports.source().to_string()),
            Some(targets) => ExportsSpec::Detailed {
                package: exports.source().to_string(),
                to: Some(targets.iter().cloned().collect()),
            },
        }
    }
}

/// Parse a module.toml string straight into a descriptor
pub fn parse_descriptor(content: &str) -> Result<ModuleDescriptor, ManifestError> {
    let manifest: ModuleManifest = toml::from_str(content)?;
    manifest.to_descriptor()
}

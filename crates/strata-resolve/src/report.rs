//! Resolution reports
//!
//! A serialisable snapshot of one configuration: which modules were selected,
//! where they came from and what each of them reads. Reports can be written as
//! TOML or JSON and read back for comparison.

use crate::configuration::Configuration;
use crate::hash::HashAlgorithm;
use crate::reference::HashError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while producing or reading a report
#[derive(Debug, Error)]
pub enum ReportError {
    /// Failed to read or write the report file
    #[error("Failed to access report: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse report: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Failed to parse JSON
    #[error("Failed to parse report: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Failed to serialize report
    #[error("Failed to serialize report: {0}")]
    SerializeError(String),

    /// Validation error
    #[error("Invalid report: {0}")]
    ValidationError(String),

    /// Failed to hash a module's content
    #[error("Failed to hash module content: {0}")]
    HashError(#[from] HashError),
}

/// Report format version
pub const REPORT_VERSION: u32 = 1;

/// Serialisation format of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Toml,
    Json,
}

impl ReportFormat {
    /// Pick a format from a file extension, defaulting to TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ReportFormat::Json,
            _ => ReportFormat::Toml,
        }
    }
}

/// Snapshot of a resolved configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResolutionReport {
    /// Report format version
    pub version: u32,

    /// Hash algorithm used for module hashes, if any were computed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<String>,

    /// Root module names
    #[serde(default)]
    pub roots: Vec<String>,

    /// Selected modules, in selection order
    #[serde(default)]
    pub modules: Vec<ReportedModule>,
}

/// One selected module
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportedModule {
    /// Module name
    pub name: String,

    /// Location the module was found at
    pub location: String,

    /// Whether the module's descriptor was derived
    #[serde(default, skip_serializing_if = "is_false")]
    pub automatic: bool,

    /// Names of the modules this module reads, sorted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reads: Vec<String>,

    /// Hex digest of the module's content
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl ResolutionReport {
    /// Snapshot a configuration
    ///
    /// With an algorithm, every module with content gets a hash; modules
    /// without content are reported without one.
    pub fn from_configuration(
        configuration: &Configuration,
        algorithm: Option<HashAlgorithm>,
    ) -> Result<Self, ReportError> {
        let mut modules = Vec::with_capacity(configuration.len());

        for module in configuration.modules() {
            let reads = configuration
                .reads(module.name())
                .unwrap_or_default()
                .into_iter()
                .map(|m| m.name().to_string())
                .collect();

            let hash = match algorithm {
                Some(algorithm) => match module.compute_hash(algorithm) {
                    Ok(hash) => Some(hash),
                    Err(HashError::Unavailable(_)) => None,
                    Err(e) => return Err(e.into()),
                },
                None => None,
            };

            modules.push(ReportedModule {
                name: module.name().to_string(),
                location: module.location().to_string(),
                automatic: module.descriptor().is_automatic(),
                reads,
                hash,
            });
        }

        Ok(Self {
            version: REPORT_VERSION,
            algorithm: algorithm.map(|a| a.name().to_string()),
            roots: configuration.roots().to_vec(),
            modules,
        })
    }

    /// Parse a report from a file, choosing the format by extension
    pub fn from_file(path: &Path) -> Result<Self, ReportError> {
        let content = std::fs::read_to_string(path)?;
        match ReportFormat::from_path(path) {
            ReportFormat::Toml => Self::from_str(&content),
            ReportFormat::Json => Self::from_json_str(&content),
        }
    }

    /// Parse a TOML report
    pub fn from_str(content: &str) -> Result<Self, ReportError> {
        let report: ResolutionReport = toml::from_str(content)?;
        report.validate()?;
        Ok(report)
    }

    /// Parse a JSON report
    pub fn from_json_str(content: &str) -> Result<Self, ReportError> {
        let report: ResolutionReport = serde_json::from_str(content)?;
        report.validate()?;
        Ok(report)
    }

    /// Validate the report
    pub fn validate(&self) -> Result<(), ReportError> {
        if self.version != REPORT_VERSION {
            return Err(ReportError::ValidationError(format!(
                "Unsupported report version: {} (expected {})",
                self.version, REPORT_VERSION
            )));
        }

        if let Some(algorithm) = &self.algorithm {
            algorithm
                .parse::<HashAlgorithm>()
                .map_err(|e| ReportError::ValidationError(e.to_string()))?;
        }

        let mut seen = std::collections::HashSet::new();
        for module in &self.modules {
            if module.name.is_empty() {
                return Err(ReportError::ValidationError(
                    "Module name cannot be empty".to_string(),
                ));
            }
            if !seen.insert(module.name.as_str()) {
                return Err(ReportError::ValidationError(format!(
                    "Module '{}' is listed more than once",
                    module.name
                )));
            }
            if let Some(hash) = &module.hash {
                if hash.is_empty() || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
                    return Err(ReportError::ValidationError(format!(
                        "Module '{}' has invalid hash (must be hex characters)",
                        module.name
                    )));
                }
            }
        }

        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, ReportError> {
        toml::to_string_pretty(self).map_err(|e| ReportError::SerializeError(e.to_string()))
    }

    pub fn to_json_string(&self) -> Result<String, ReportError> {
        serde_json::to_string_pretty(self).map_err(|e| ReportError::SerializeError(e.to_string()))
    }

    /// Write the report, choosing the format by extension
    pub fn to_file(&self, path: &Path) -> Result<(), ReportError> {
        let content = match ReportFormat::from_path(path) {
            ReportFormat::Toml => self.to_toml_string()?,
            ReportFormat::Json => self.to_json_string()?,
        };
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get a reported module by name
    pub fn get_module(&self, name: &str) -> Option<&ReportedModule> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Get all module names, in selection order
    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ModuleDescriptor;
    use crate::finder::{EmptyFinder, ModuleFinder, StaticFinder};
    use crate::reference::ModuleReference;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn configuration() -> Rc<Configuration> {
        let references = vec![
            ModuleReference::from_bytes(
                ModuleDescriptor::builder("app").requires("lib").build().unwrap(),
                "mem:/app",
                b"app".to_vec(),
            ),
            ModuleReference::new(
                ModuleDescriptor::builder("lib").build().unwrap(),
                "mem:/lib",
            ),
        ];
        let before: Rc<dyn ModuleFinder> = Rc::new(StaticFinder::new(references).unwrap());
        Configuration::resolve(before, None, Rc::new(EmptyFinder), ["app"]).unwrap()
    }

    #[test]
    fn test_from_configuration() {
        let report =
            ResolutionReport::from_configuration(&configuration(), Some(HashAlgorithm::Sha256))
                .unwrap();

        assert_eq!(report.version, REPORT_VERSION);
        assert_eq!(report.algorithm.as_deref(), Some("SHA-256"));
        assert_eq!(report.roots, vec!["app"]);
        assert_eq!(report.module_names(), vec!["app", "lib"]);

        let app = report.get_module("app").unwrap();
        assert_eq!(app.reads, vec!["lib"]);
        assert_eq!(
            app.hash.as_deref(),
            Some(HashAlgorithm::Sha256.digest(b"app").as_str())
        );

        // No content, no hash
        assert!(report.get_module("lib").unwrap().hash.is_none());
    }

    #[test]
    fn test_toml_and_json_agree() {
        let report = ResolutionReport::from_configuration(&configuration(), None).unwrap();

        let toml = report.to_toml_string().unwrap();
        assert!(toml.contains("name = \"app\""));
        assert!(!toml.contains("hash"));

        let json = report.to_json_string().unwrap();
        assert_eq!(
            ResolutionReport::from_str(&toml).unwrap(),
            ResolutionReport::from_json_str(&json).unwrap()
        );
    }

    #[test]
    fn test_write_and_read_by_extension() {
        let temp = TempDir::new().unwrap();
        let report = ResolutionReport::from_configuration(&configuration(), None).unwrap();

        let json_path = temp.path().join("report.json");
        report.to_file(&json_path).unwrap();
        let content = std::fs::read_to_string(&json_path).unwrap();
        assert!(content.trim_start().starts_with('{'));
        assert_eq!(ResolutionReport::from_file(&json_path).unwrap(), report);

        let toml_path = temp.path().join("report.toml");
        report.to_file(&toml_path).unwrap();
        assert_eq!(ResolutionReport::from_file(&toml_path).unwrap(), report);
    }

    #[test]
    fn test_validate_rejects_bad_reports() {
        let toml = r#"
version = 2
roots = []
"#;
        assert!(matches!(
            ResolutionReport::from_str(toml),
            Err(ReportError::ValidationError(_))
        ));

        let toml = r#"
version = 1
roots = ["a"]

[[modules]]
name = "a"
location = "mem:/a"

[[modules]]
name = "a"
location = "mem:/other"
"#;
        let err = ResolutionReport::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("more than once"));

        let toml = r#"
version = 1
roots = ["a"]

[[modules]]
name = "a"
location = "mem:/a"
hash = "not-hex"
"#;
        assert!(ResolutionReport::from_str(toml).is_err());
    }
}

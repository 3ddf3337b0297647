//! Project configuration (strata.toml)
//!
//! Optional defaults for the CLI, discovered by walking up from the working
//! directory. Relative paths are taken relative to the file's directory.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration file name
pub const CONFIG_FILE: &str = "strata.toml";

/// Contents of strata.toml
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct StrataConfig {
    pub resolve: ResolveSection,
    pub log: LogSection,
}

/// The `[resolve]` table
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct ResolveSection {
    /// Directories searched after the parent (after-finder)
    pub module_path: Vec<PathBuf>,

    /// Directories searched before the parent (before-finder)
    pub upgrade_path: Vec<PathBuf>,

    /// Default root modules
    pub roots: Vec<String>,

    /// Bind service providers after resolving
    pub bind: Option<bool>,

    pub hash_algorithm: Option<String>,
}

/// The `[log]` table
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LogSection {
    pub level: Option<String>,
}

impl StrataConfig {
    /// Read a config file, resolving its paths against its directory
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_str(&content, base)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Parse config content, resolving relative paths against `base`
    pub fn from_str(content: &str, base: &Path) -> Result<Self> {
        let mut config: StrataConfig = toml::from_str(content)?;
        for path in config
            .resolve
            .module_path
            .iter_mut()
            .chain(config.resolve.upgrade_path.iter_mut())
        {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        }
        Ok(config)
    }

    /// Find and load the nearest strata.toml, if any
    pub fn discover(start_dir: &Path) -> Result<Option<(PathBuf, Self)>> {
        match find_config(start_dir) {
            Some(path) => {
                let config = Self::from_file(&path)?;
                tracing::debug!(path = %path.display(), "loaded configuration");
                Ok(Some((path, config)))
            }
            None => Ok(None),
        }
    }
}

/// Find strata.toml in `start_dir` or the nearest ancestor holding one
pub fn find_config(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir;

    loop {
        let candidate = current.join(CONFIG_FILE);
        if candidate.is_file() {
            return Some(candidate);
        }

        current = current.parent()?;
    }
}

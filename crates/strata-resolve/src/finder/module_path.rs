//! Module path scanning
//!
//! Locates modules in an ordered list of directories. Each entry is either one
//! exploded module (it holds a `module.toml`) or a directory of modules. A
//! child directory without a manifest becomes an automatic module.

use super::{FinderError, ModuleFinder};
use crate::descriptor::{is_legal_name, ModuleDescriptor};
use crate::manifest::ModuleManifest;
use crate::reference::{ModuleContent, ModuleReference};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of an explicit module's manifest
pub const MODULE_MANIFEST: &str = "module.toml";

/// Directory inside an automatic module listing service providers
const SERVICES_DIR: &str = "services";

#[derive(Debug, Default)]
struct ScanState {
    /// Index of the next path entry to scan
    next_entry: usize,

    /// Everything seen so far; earlier entries win
    cache: IndexMap<String, ModuleReference>,
}

/// Finder over a module path
///
/// Entries are scanned lazily, one at a time, and everything seen is cached.
/// The cache lives behind a `RefCell`, so a `ModulePathFinder` is not `Sync`
/// and cannot be shared between threads; give each thread its own finder.
#[derive(Debug)]
pub struct ModulePathFinder {
    entries: Vec<PathBuf>,
    state: RefCell<ScanState>,
}

impl ModulePathFinder {
    pub fn new<I, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
            state: RefCell::new(ScanState::default()),
        }
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Scan the next unscanned entry into the cache
    fn scan_next(&self, state: &mut ScanState) -> Result<(), FinderError> {
        let entry = &self.entries[state.next_entry];
        for reference in scan_entry(entry)? {
            let name = reference.name().to_string();
            if let Some(existing) = state.cache.get(&name) {
                tracing::debug!(
                    module = %name,
                    kept = %existing.location(),
                    ignored = %reference.location(),
                    "module already found earlier on the module path"
                );
                continue;
            }
            state.cache.insert(name, reference);
        }
        state.next_entry += 1;
        Ok(())
    }
}

impl ModuleFinder for ModulePathFinder {
    fn find(&self, name: &str) -> Result<Option<ModuleReference>, FinderError> {
        let mut state = self.state.borrow_mut();
        loop {
            if let Some(reference) = state.cache.get(name) {
                return Ok(Some(reference.clone()));
            }
            if state.next_entry >= self.entries.len() {
                return Ok(None);
            }
            self.scan_next(&mut state)?;
        }
    }

    fn find_all(&self) -> Result<Vec<ModuleReference>, FinderError> {
        let mut state = self.state.borrow_mut();
        while state.next_entry < self.entries.len() {
            self.scan_next(&mut state)?;
        }
        Ok(state.cache.values().cloned().collect())
    }
}

/// Read every module in one path entry
fn scan_entry(entry: &Path) -> Result<Vec<ModuleReference>, FinderError> {
    if !entry.exists() {
        tracing::debug!(path = %entry.display(), "skipping missing module path entry");
        return Ok(Vec::new());
    }
    if !entry.is_dir() {
        tracing::debug!(path = %entry.display(), "skipping module path entry that is not a directory");
        return Ok(Vec::new());
    }
    if entry.join(MODULE_MANIFEST).is_file() {
        return Ok(vec![read_explicit(entry)?]);
    }

    let mut children = Vec::new();
    for child in fs::read_dir(entry).map_err(|source| io_error(entry, source))? {
        let child = child.map_err(|source| io_error(entry, source))?;
        let path = child.path();
        if path.is_dir() && !is_hidden(&path) {
            children.push(path);
        }
    }
    children.sort();

    let mut found: IndexMap<String, ModuleReference> = IndexMap::new();
    for dir in children {
        let reference = if dir.join(MODULE_MANIFEST).is_file() {
            read_explicit(&dir)?
        } else {
            read_automatic(&dir)?
        };

        if let Some(existing) = found.get(reference.name()) {
            return Err(FinderError::DuplicateModule {
                name: reference.name().to_string(),
                first: existing.location().to_string(),
                second: reference.location().to_string(),
            });
        }
        tracing::trace!(module = %reference.name(), path = %dir.display(), "found module");
        found.insert(reference.name().to_string(), reference);
    }

    Ok(found.into_values().collect())
}

/// Read a module directory that has a manifest
fn read_explicit(dir: &Path) -> Result<ModuleReference, FinderError> {
    let manifest_path = dir.join(MODULE_MANIFEST);
    let descriptor = ModuleManifest::from_file(&manifest_path)
        .and_then(|manifest| manifest.to_descriptor())
        .map_err(|source| FinderError::Manifest {
            path: manifest_path,
            source,
        })?;

    Ok(ModuleReference::with_content(
        descriptor,
        dir.display().to_string(),
        ModuleContent::Directory(dir.to_path_buf()),
    ))
}

/// Synthesize a descriptor for a directory without a manifest
///
/// The module requires nothing explicitly (it reads everything once resolved),
/// exports every package it contains, and provides the services listed under
/// `services/`.
fn read_automatic(dir: &Path) -> Result<ModuleReference, FinderError> {
    let file_name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = automatic_module_name(&file_name).ok_or_else(|| FinderError::InvalidModule {
        path: dir.to_path_buf(),
        reason: format!("cannot derive a module name from '{}'", file_name),
    })?;

    let mut packages = BTreeSet::new();
    collect_packages(dir, dir, &mut packages)?;

    let mut builder = ModuleDescriptor::builder(name).automatic(true);
    for package in packages {
        builder = builder.exports(package);
    }
    for (service, providers) in read_services(dir)? {
        builder = builder.provides(service, providers);
    }

    let descriptor = builder.build().map_err(|e| FinderError::InvalidModule {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(ModuleReference::with_content(
        descriptor,
        dir.display().to_string(),
        ModuleContent::Directory(dir.to_path_buf()),
    ))
}

/// Every sub-directory directly holding a file becomes a package
fn collect_packages(
    root: &Path,
    dir: &Path,
    packages: &mut BTreeSet<String>,
) -> Result<(), FinderError> {
    let mut has_file = false;
    let mut subdirs = Vec::new();
    for entry in fs::read_dir(dir).map_err(|source| io_error(dir, source))? {
        let entry = entry.map_err(|source| io_error(dir, source))?;
        let path = entry.path();
        if is_hidden(&path) {
            continue;
        }
        if path.is_dir() {
            if dir == root && path.file_name().is_some_and(|n| n == SERVICES_DIR) {
                continue;
            }
            subdirs.push(path);
        } else if path.is_file() {
            has_file = true;
        }
    }

    if has_file && dir != root {
        if let Ok(relative) = dir.strip_prefix(root) {
            let package = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join(".");
            if is_legal_name(&package) {
                packages.insert(package);
            } else {
                tracing::debug!(path = %dir.display(), "directory is not a legal package name");
            }
        }
    }

    for subdir in subdirs {
        collect_packages(root, &subdir, packages)?;
    }
    Ok(())
}

/// Read `services/<ServiceType>` provider lists
fn read_services(dir: &Path) -> Result<Vec<(String, Vec<String>)>, FinderError> {
    let services_dir = dir.join(SERVICES_DIR);
    if !services_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut services = Vec::new();
    for entry in fs::read_dir(&services_dir).map_err(|source| io_error(&services_dir, source))? {
        let entry = entry.map_err(|source| io_error(&services_dir, source))?;
        let path = entry.path();
        let service = entry.file_name().to_string_lossy().into_owned();
        if !path.is_file() || !is_legal_name(&service) {
            continue;
        }

        let content = fs::read_to_string(&path).map_err(|source| io_error(&path, source))?;
        let providers: Vec<String> = content
            .lines()
            .map(|line| line.split('#').next().unwrap_or("").trim())
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        if !providers.is_empty() {
            services.push((service, providers));
        }
    }
    services.sort();
    Ok(services)
}

/// Derive a module name from a directory name
///
/// A trailing version (`-` followed by a digit) is dropped, runs of other
/// characters that are not alphanumeric become `.`, and segments starting with
/// a digit get a `_` prefix. Returns `None` when nothing usable is left.
pub fn automatic_module_name(file_name: &str) -> Option<String> {
    let bytes = file_name.as_bytes();
    let base = file_name
        .char_indices()
        .find(|&(i, c)| c == '-' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit))
        .map_or(file_name, |(i, _)| &file_name[..i]);

    let mut dotted = String::with_capacity(base.len());
    for c in base.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            dotted.push(c);
        } else if !dotted.ends_with('.') {
            dotted.push('.');
        }
    }

    let name = dotted
        .split('.')
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.starts_with(|c: char| c.is_ascii_digit()) {
                format!("_{}", s)
            } else {
                s.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(".");

    is_legal_name(&name).then_some(name)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .is_some_and(|n| n.to_string_lossy().starts_with('.'))
}

fn io_error(path: &Path, source: std::io::Error) -> FinderError {
    FinderError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_automatic_module_name() {
        assert_eq!(automatic_module_name("commons-io-2.11.0"), Some("commons.io".to_string()));
        assert_eq!(automatic_module_name("foo_bar"), Some("foo_bar".to_string()));
        assert_eq!(automatic_module_name("my..lib--x"), Some("my.lib.x".to_string()));
        assert_eq!(automatic_module_name("lib.3d"), Some("lib._3d".to_string()));
        assert_eq!(automatic_module_name("-1.0"), None);
        assert_eq!(automatic_module_name("..."), None);
    }

    #[test]
    fn test_missing_entry_is_skipped() {
        let temp = tempfile::tempdir().unwrap();
        let finder = ModulePathFinder::new(vec![temp.path().join("missing")]);
        assert!(finder.find("anything").unwrap().is_none());
        assert!(finder.find_all().unwrap().is_empty());
    }

    #[test]
    fn test_scan_is_incremental() {
        let temp = tempfile::tempdir().unwrap();
        let first = temp.path().join("first");
        let second = temp.path().join("second");
        fs::create_dir_all(first.join("a")).unwrap();
        fs::create_dir_all(second.join("b")).unwrap();
        fs::write(first.join("a").join(MODULE_MANIFEST), "[module]\nname = \"a\"\n").unwrap();
        fs::write(second.join("b").join(MODULE_MANIFEST), "[module]\nname = \"b\"\n").unwrap();

        let finder = ModulePathFinder::new(vec![first, second]);
        assert!(finder.find("a").unwrap().is_some());
        assert_eq!(finder.state.borrow().next_entry, 1);

        assert!(finder.find("b").unwrap().is_some());
        assert_eq!(finder.state.borrow().next_entry, 2);
    }
}

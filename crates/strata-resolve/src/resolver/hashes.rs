//! Dependency hash verification and recording

use super::{resolve_target, Resolver, Selection};
use crate::configuration::Configuration;
use crate::descriptor::ModuleHashes;
use crate::error::ResolutionError;
use crate::finder::ModuleFinder;
use crate::hash::HashAlgorithm;
use crate::reference::{HashError, ModuleReference};
use std::collections::BTreeMap;

/// Check every recorded dependency hash against the dependency's content
///
/// Recorded dependencies that are not part of the configuration are not
/// checked; the record may name modules that were never required.
pub(super) fn check_hashes(
    selected: &Selection,
    parent: Option<&Configuration>,
) -> Result<(), ResolutionError> {
    for module in selected.values() {
        let Some(hashes) = module.descriptor().hashes() else {
            continue;
        };
        if hashes.is_empty() {
            continue;
        }

        for (dependency, recorded) in hashes.iter() {
            let Some(other) = resolve_target(selected, parent, dependency) else {
                tracing::debug!(
                    module = %module.name(),
                    dependency = %dependency,
                    "hashed dependency not in configuration"
                );
                continue;
            };

            let algorithm: HashAlgorithm =
                hashes
                    .algorithm()
                    .parse()
                    .map_err(|e: crate::hash::UnknownAlgorithm| {
                        ResolutionError::HashUnavailable {
                            module: module.name().to_string(),
                            dependency: dependency.to_string(),
                            reason: e.to_string(),
                        }
                    })?;

            let actual = hash_of(module.name(), other, algorithm)?;
            if !actual.eq_ignore_ascii_case(recorded) {
                return Err(ResolutionError::HashMismatch {
                    module: module.name().to_string(),
                    dependency: dependency.to_string(),
                    recorded: recorded.to_string(),
                    actual,
                });
            }
            tracing::trace!(module = %module.name(), dependency = %dependency, "hash verified");
        }
    }

    Ok(())
}

/// Compute the hashes a module should record for its direct dependences
///
/// Every module named by a `requires` edge of `module` must be present in
/// the configuration or one of its ancestors.
pub fn record_hashes(
    configuration: &Configuration,
    module: &str,
    algorithm: HashAlgorithm,
) -> Result<ModuleHashes, ResolutionError> {
    let reference = configuration
        .find_module(module)
        .ok_or_else(|| ResolutionError::UnknownModule(module.to_string()))?;

    hashes_for(reference, |name| configuration.find_module(name), algorithm)
}

/// Resolve `module` and compute the hashes it should record, ignoring any
/// hashes it already records
///
/// Unlike [`record_hashes`] this does not need a configuration that passed
/// hash verification, so a stale `[hashes]` table can be replaced.
pub fn rehash_dependences(
    before: &dyn ModuleFinder,
    parent: Option<&Configuration>,
    after: &dyn ModuleFinder,
    module: &str,
    algorithm: HashAlgorithm,
) -> Result<ModuleHashes, ResolutionError> {
    let mut resolver = Resolver::new(before, parent, after);
    resolver.resolve_roots(&[module.to_string()])?;

    let selected = &resolver.selected;
    let reference = resolve_target(selected, parent, module)
        .ok_or_else(|| ResolutionError::UnknownModule(module.to_string()))?;

    hashes_for(
        reference,
        |name| resolve_target(selected, parent, name),
        algorithm,
    )
}

fn hashes_for<'c>(
    reference: &ModuleReference,
    find: impl Fn(&str) -> Option<&'c ModuleReference>,
    algorithm: HashAlgorithm,
) -> Result<ModuleHashes, ResolutionError> {
    let mut hashes = BTreeMap::new();
    for requires in reference.descriptor().requires() {
        let dependency =
            find(requires.name()).ok_or_else(|| ResolutionError::ModuleNotFound {
                module: requires.name().to_string(),
                required_by: Some(reference.name().to_string()),
            })?;
        hashes.insert(
            requires.name().to_string(),
            hash_of(reference.name(), dependency, algorithm)?,
        );
    }

    Ok(ModuleHashes::new(algorithm.name(), hashes))
}

fn hash_of(
    dependent: &str,
    dependency: &ModuleReference,
    algorithm: HashAlgorithm,
) -> Result<String, ResolutionError> {
    dependency.compute_hash(algorithm).map_err(|e| match e {
        HashError::Unavailable(_) => ResolutionError::HashUnavailable {
            module: dependent.to_string(),
            dependency: dependency.name().to_string(),
            reason: "no content available to hash".to_string(),
        },
        HashError::Io { module, source } => ResolutionError::Io { module, source },
    })
}

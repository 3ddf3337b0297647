//! Service binding
//!
//! Augments a selection with modules providing services that selected (or
//! ancestor) modules use. Newly added providers may use services themselves,
//! so this runs to a fixpoint.

use super::Resolver;
use crate::error::ResolutionError;
use crate::reference::ModuleReference;
use rustc_hash::{FxHashMap, FxHashSet};

/// Service type -> providers, in finder order
type ServiceCatalog = FxHashMap<String, Vec<ModuleReference>>;

/// Add service providers to the resolver's selection
///
/// Returns the number of modules added.
pub(crate) fn bind_services(resolver: &mut Resolver<'_>) -> Result<usize, ResolutionError> {
    let catalog = service_catalog(resolver)?;
    let initial = resolver.selected.len();

    // Every descriptor visible to the configuration is a potential consumer
    let mut consumers: Vec<ModuleReference> = resolver.selected.values().cloned().collect();
    if let Some(parent) = resolver.parent {
        for layer in std::iter::once(parent).chain(parent.ancestors()) {
            consumers.extend(layer.modules().cloned());
        }
    }

    let mut round = 0usize;
    while !consumers.is_empty() {
        round += 1;
        let mut worklist = Vec::new();

        for consumer in &consumers {
            for service in consumer.descriptor().uses() {
                let Some(providers) = catalog.get(service) else {
                    continue;
                };
                for provider in providers {
                    if provider.name() == consumer.name()
                        || resolver.selected.contains_key(provider.name())
                    {
                        continue;
                    }
                    tracing::debug!(
                        round,
                        service = %service,
                        provider = %provider.name(),
                        consumer = %consumer.name(),
                        "binding service provider"
                    );
                    resolver
                        .selected
                        .insert(provider.name().to_string(), provider.clone());
                    worklist.push(provider.clone());
                }
            }
        }

        // The next round only needs to look at what this round added
        let mut added = worklist.clone();
        added.extend(resolver.drain(worklist)?);
        consumers = added;
    }

    Ok(resolver.selected.len() - initial)
}

/// Collect the providers both finders can locate
///
/// Precedence matches resolution: a module from the before-finder always
/// counts; one from the after-finder only if neither the before-finder nor an
/// ancestor configuration already supplies that name.
fn service_catalog(resolver: &Resolver<'_>) -> Result<ServiceCatalog, ResolutionError> {
    let mut catalog = ServiceCatalog::default();
    let mut seen: FxHashSet<String> = FxHashSet::default();

    let before = resolver.before.find_all()?;
    let after = resolver.after.find_all()?;

    let candidates = before
        .into_iter()
        .map(|m| (m, true))
        .chain(after.into_iter().map(|m| (m, false)));
    for (module, from_before) in candidates {
        if seen.contains(module.name()) {
            continue;
        }
        let in_parent = resolver
            .parent
            .and_then(|p| p.find_module(module.name()))
            .is_some();
        if !from_before && in_parent {
            continue;
        }
        seen.insert(module.name().to_string());

        for service in module.descriptor().provides().keys() {
            catalog
                .entry(service.clone())
                .or_default()
                .push(module.clone());
        }
    }

    Ok(catalog)
}

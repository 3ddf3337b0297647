//! Exported package conflict checking

use super::{ReadsGraph, Selection};
use crate::error::{ExportConflict, ResolutionError};
use crate::reference::ModuleReference;
use rustc_hash::FxHashMap;

/// Check that no selected module can see a package from two suppliers
///
/// A module's own packages count as supplied by the module itself. Modules
/// are checked in selection order and the modules each one reads in name
/// order, so the reported conflict is deterministic.
pub(super) fn check_export_suppliers(
    selected: &Selection,
    graph: &ReadsGraph,
) -> Result<(), ResolutionError> {
    for module in selected.values() {
        let Some(reads) = graph.get(module) else {
            continue;
        };

        let mut suppliers: FxHashMap<&str, &ModuleReference> = FxHashMap::default();
        for package in module.descriptor().packages() {
            suppliers.insert(package.as_str(), module);
        }

        let mut readable: Vec<&ModuleReference> = reads.iter().collect();
        readable.sort_by(|a, b| (a.name(), a.location()).cmp(&(b.name(), b.location())));

        for other in readable {
            for export in other.descriptor().exports() {
                if !export.is_visible_to(module.name()) {
                    continue;
                }
                let package = export.source();
                match suppliers.get(package) {
                    None => {
                        suppliers.insert(package, other);
                    }
                    Some(existing) if *existing == other => {}
                    Some(existing) if *existing == module => {
                        return Err(ExportConflict::LocalPackage {
                            module: module.name().to_string(),
                            package: package.to_string(),
                            exporter: other.name().to_string(),
                        }
                        .into());
                    }
                    Some(existing) => {
                        return Err(ExportConflict::DuplicateSupplier {
                            first: existing.name().to_string(),
                            second: other.name().to_string(),
                            package: package.to_string(),
                            module: module.name().to_string(),
                        }
                        .into());
                    }
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ModuleDescriptor;
    use rustc_hash::FxHashSet;

    fn reference(descriptor: ModuleDescriptor) -> ModuleReference {
        let location = format!("mem:/{}", descriptor.name());
        ModuleReference::new(descriptor, location)
    }

    fn setup(modules: Vec<ModuleReference>, reader: &str) -> (Selection, ReadsGraph) {
        let selected: Selection = modules
            .into_iter()
            .map(|m| (m.name().to_string(), m))
            .collect();
        let mut graph = ReadsGraph::default();
        for module in selected.values() {
            let reads: FxHashSet<ModuleReference> = if module.name() == reader {
                selected
                    .values()
                    .filter(|m| m.name() != reader)
                    .cloned()
                    .collect()
            } else {
                FxHashSet::default()
            };
            graph.insert(module.clone(), reads);
        }
        (selected, graph)
    }

    #[test]
    fn test_two_suppliers_conflict() {
        let (selected, graph) = setup(
            vec![
                reference(ModuleDescriptor::builder("n").build().unwrap()),
                reference(ModuleDescriptor::builder("m1").exports("p").build().unwrap()),
                reference(ModuleDescriptor::builder("m2").exports("p").build().unwrap()),
            ],
            "n",
        );

        let err = check_export_suppliers(&selected, &graph).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Modules m1 and m2 export package p to module n"
        );
    }

    #[test]
    fn test_local_package_conflict() {
        let (selected, graph) = setup(
            vec![
                reference(ModuleDescriptor::builder("m").package("p").build().unwrap()),
                reference(ModuleDescriptor::builder("n").exports("p").build().unwrap()),
            ],
            "m",
        );

        let err = check_export_suppliers(&selected, &graph).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Module m contains package p, module n exports package p to m"
        );
    }

    #[test]
    fn test_qualified_export_to_someone_else_is_invisible() {
        let (selected, graph) = setup(
            vec![
                reference(ModuleDescriptor::builder("n").build().unwrap()),
                reference(ModuleDescriptor::builder("m1").exports("p").build().unwrap()),
                reference(
                    ModuleDescriptor::builder("m2")
                        .exports_to("p", ["friend"])
                        .build()
                        .unwrap(),
                ),
            ],
            "n",
        );

        assert!(check_export_suppliers(&selected, &graph).is_ok());
    }

    #[test]
    fn test_unread_suppliers_do_not_conflict() {
        let (selected, graph) = setup(
            vec![
                reference(ModuleDescriptor::builder("m1").exports("p").build().unwrap()),
                reference(ModuleDescriptor::builder("m2").exports("p").build().unwrap()),
            ],
            "nobody",
        );

        assert!(check_export_suppliers(&selected, &graph).is_ok());
    }
}

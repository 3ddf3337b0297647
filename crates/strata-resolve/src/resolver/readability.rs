//! Readability graph construction
//!
//! Every `requires` edge becomes a "reads" edge. On top of that, if `a` reads
//! `b` and `b` has `requires public c`, then `a` also reads `c`, transitively.
//! Public edges of modules in ancestor configurations take part as well, and
//! an automatic module behaves as if it had `requires public` on every other
//! module it can see.

use super::{resolve_target, ReadsGraph, Selection};
use crate::configuration::Configuration;
use crate::reference::ModuleReference;
use rustc_hash::{FxHashMap, FxHashSet};

/// Build the readability graph for the selected modules
///
/// The returned graph has one entry per selected module. Edge targets may be
/// modules from ancestor configurations.
pub(super) fn make_graph(selected: &Selection, parent: Option<&Configuration>) -> ReadsGraph {
    // Every module in the parent chain, nearest layer first
    let ancestors: Vec<&Configuration> = parent
        .into_iter()
        .flat_map(|p| std::iter::once(p).chain(p.ancestors()))
        .collect();

    // g1: reads, g2: requires public
    let mut g1: ReadsGraph = FxHashMap::default();
    let mut g2: ReadsGraph = FxHashMap::default();

    for module in selected.values() {
        let mut reads = FxHashSet::default();
        let mut public = FxHashSet::default();
        for requires in module.descriptor().requires() {
            if let Some(target) = resolve_target(selected, parent, requires.name()) {
                reads.insert(target.clone());
                if requires.is_public() {
                    public.insert(target.clone());
                }
            }
        }
        g1.insert(module.clone(), reads);
        g2.insert(module.clone(), public);
    }

    // Ancestors are recomputed from their descriptors rather than copied from
    // their graphs, each resolving names from its own layer.
    for (depth, layer) in ancestors.iter().enumerate() {
        for module in layer.modules() {
            let mut public = FxHashSet::default();
            if module.descriptor().is_automatic() {
                for other in ancestors[depth..].iter().flat_map(|c| c.modules()) {
                    if other != module {
                        public.insert(other.clone());
                    }
                }
            } else {
                for requires in module.descriptor().requires() {
                    if !requires.is_public() {
                        continue;
                    }
                    if let Some(target) = layer.find_module(requires.name()) {
                        public.insert(target.clone());
                    }
                }
            }
            g2.entry(module.clone()).or_insert(public);
        }
    }

    // Automatic modules read, and re-export, everything else they can see
    let everything: Vec<&ModuleReference> = selected
        .values()
        .chain(ancestors.iter().flat_map(|c| c.modules()))
        .collect();
    for module in selected.values() {
        if !module.descriptor().is_automatic() {
            continue;
        }
        for other in everything.iter().filter(|other| **other != module) {
            if let Some(reads) = g1.get_mut(module) {
                reads.insert((*other).clone());
            }
            if let Some(public) = g2.get_mut(module) {
                public.insert((*other).clone());
            }
        }
    }

    propagate(&mut g1, &g2);
    g1
}

/// Close `g1` under composition with `g2`
///
/// Each pass collects the new edges first and applies them afterwards, so g1
/// is never modified while it is being iterated.
fn propagate(g1: &mut ReadsGraph, g2: &ReadsGraph) {
    let mut passes = 0usize;
    loop {
        let mut additions: Vec<(ModuleReference, ModuleReference)> = Vec::new();
        for (m1, reads) in g1.iter() {
            for m2 in reads {
                let Some(public) = g2.get(m2) else {
                    continue;
                };
                for m3 in public {
                    if m3 != m1 && !reads.contains(m3) {
                        additions.push((m1.clone(), m3.clone()));
                    }
                }
            }
        }

        passes += 1;
        if additions.is_empty() {
            break;
        }
        for (m1, m3) in additions {
            if let Some(reads) = g1.get_mut(&m1) {
                reads.insert(m3);
            }
        }
    }
    tracing::trace!(passes, "readability propagation reached fixpoint");
}

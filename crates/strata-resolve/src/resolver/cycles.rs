//! Cycle detection over newly selected modules

use super::Selection;
use crate::descriptor::Requires;
use crate::error::ResolutionError;
use crate::reference::ModuleReference;
use rustc_hash::FxHashSet;
use std::collections::btree_set;

/// Check that the `requires` graph restricted to `selected` is acyclic
///
/// Modules supplied by a parent configuration are leaves. Each module is
/// finished at most once, so cross edges into finished modules are not
/// revisited.
pub(super) fn detect_cycles(selected: &Selection) -> Result<(), ResolutionError> {
    let mut finished: FxHashSet<&str> = FxHashSet::default();

    for start in selected.values() {
        if finished.contains(start.name()) {
            continue;
        }
        visit(start, selected, &mut finished)?;
    }

    Ok(())
}

/// Depth-first walk from `start` with an explicit stack
fn visit<'a>(
    start: &'a ModuleReference,
    selected: &'a Selection,
    finished: &mut FxHashSet<&'a str>,
) -> Result<(), ResolutionError> {
    let mut path: Vec<&'a str> = vec![start.name()];
    let mut on_path: FxHashSet<&'a str> = FxHashSet::default();
    on_path.insert(start.name());
    let mut stack: Vec<(&'a ModuleReference, btree_set::Iter<'a, Requires>)> =
        vec![(start, start.descriptor().requires().iter())];

    loop {
        let next = match stack.last_mut() {
            Some((_, edges)) => edges.next(),
            None => return Ok(()),
        };

        match next {
            Some(requires) => {
                let Some(target) = selected.get(requires.name()) else {
                    continue;
                };
                let name = target.name();
                if on_path.contains(name) {
                    return Err(ResolutionError::CycleDetected(render_cycle(&path, name)));
                }
                if finished.contains(name) {
                    continue;
                }
                path.push(name);
                on_path.insert(name);
                stack.push((target, target.descriptor().requires().iter()));
            }
            None => {
                if let Some((module, _)) = stack.pop() {
                    path.pop();
                    on_path.remove(module.name());
                    finished.insert(module.name());
                }
            }
        }
    }
}

/// Render `path` from the first occurrence of `repeated`, closing the loop
fn render_cycle(path: &[&str], repeated: &str) -> String {
    let start = path.iter().position(|m| *m == repeated).unwrap_or(0);
    let mut names: Vec<&str> = path[start..].to_vec();
    names.push(repeated);
    names.join(" -> ")
}

//! `strata list`

use super::ModulePaths;
use crate::output::StyledOutput;
use anyhow::Result;
use strata_resolve::{ChainFinder, ModuleFinder};

pub fn execute(paths: &ModulePaths, out: &mut StyledOutput) -> Result<()> {
    let (before, after) = paths.finders();
    let finder = ChainFinder::new([before, after]);

    let mut modules = finder.find_all()?;
    modules.sort_by(|a, b| a.name().cmp(b.name()));

    for module in &modules {
        out.bold(module.name());
        if module.descriptor().is_automatic() {
            out.warning(" (automatic)");
        }
        out.plain(" ");
        out.dim(module.location());
        out.newline();
    }
    out.flush();

    tracing::debug!(count = modules.len(), "listed modules");
    Ok(())
}

//! `strata hash`

use super::ModulePaths;
use crate::output::StyledOutput;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use strata_resolve::manifest::HashesSection;
use strata_resolve::{
    rehash_dependences, HashAlgorithm, ModuleContent, ModuleManifest, MODULE_MANIFEST,
};

/// Document holding just a `[hashes]` table
#[derive(Serialize)]
struct HashesTable<'a> {
    hashes: &'a HashesSection,
}

pub fn execute(
    paths: &ModulePaths,
    module: &str,
    algorithm: HashAlgorithm,
    write: bool,
    out: &mut StyledOutput,
) -> Result<()> {
    // Hashes already recorded by the module are replaced, not verified
    let (before, after) = paths.finders();
    let hashes = rehash_dependences(&*before, None, &*after, module, algorithm)?;

    let section = HashesSection {
        algorithm: hashes.algorithm().to_string(),
        modules: hashes
            .iter()
            .map(|(name, hash)| (name.to_string(), hash.to_string()))
            .collect(),
    };

    if !write {
        let content = toml::to_string_pretty(&HashesTable { hashes: &section })
            .context("Failed to serialize hashes")?;
        out.plain(&content);
        out.flush();
        return Ok(());
    }

    let reference = match before.find(module)? {
        Some(reference) => reference,
        None => match after.find(module)? {
            Some(reference) => reference,
            None => bail!("Module {} not found", module),
        },
    };
    let manifest_path = match reference.content() {
        ModuleContent::Directory(dir) if dir.join(MODULE_MANIFEST).is_file() => {
            dir.join(MODULE_MANIFEST)
        }
        _ => bail!(
            "Module {} has no {} to record hashes in",
            module,
            MODULE_MANIFEST
        ),
    };

    let mut manifest = ModuleManifest::from_file(&manifest_path)
        .with_context(|| format!("Failed to read {}", manifest_path.display()))?;
    manifest.hashes = Some(section);
    manifest
        .to_file(&manifest_path)
        .with_context(|| format!("Failed to write {}", manifest_path.display()))?;

    tracing::info!(module, path = %manifest_path.display(), "recorded dependency hashes");
    out.success("Recorded");
    out.plain(&format!(
        " {} hash{} in {}",
        hashes.len(),
        if hashes.len() == 1 { "" } else { "es" },
        manifest_path.display()
    ));
    out.newline();
    Ok(())
}

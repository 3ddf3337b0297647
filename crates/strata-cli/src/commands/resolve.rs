//! `strata resolve`

use super::{ModulePaths, OutputFormat};
use crate::output::StyledOutput;
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use strata_resolve::{HashAlgorithm, ResolutionReport};

pub struct ResolveOptions {
    pub roots: Vec<String>,
    pub bind: bool,
    pub format: OutputFormat,
    pub hash_algorithm: Option<HashAlgorithm>,
    pub output: Option<PathBuf>,
}

pub fn execute(paths: &ModulePaths, options: ResolveOptions, out: &mut StyledOutput) -> Result<()> {
    if options.roots.is_empty() {
        bail!("No root modules given; pass them as arguments or set resolve.roots in strata.toml");
    }

    let mut cf = paths.resolve(options.roots.iter().cloned())?;
    if options.bind {
        cf = cf.bind()?;
    }

    let report = ResolutionReport::from_configuration(&cf, options.hash_algorithm)
        .context("Failed to build resolution report")?;

    if let Some(path) = &options.output {
        report
            .to_file(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        out.success("Wrote");
        out.plain(&format!(
            " {} modules to {}",
            report.modules.len(),
            path.display()
        ));
        out.newline();
        return Ok(());
    }

    match options.format {
        OutputFormat::Json => {
            out.plain(&report.to_json_string()?);
            out.newline();
        }
        OutputFormat::Toml => out.plain(&report.to_toml_string()?),
        OutputFormat::Text => print_text(&report, out),
    }
    out.flush();
    Ok(())
}

fn print_text(report: &ResolutionReport, out: &mut StyledOutput) {
    out.success("Resolved");
    out.plain(&format!(
        " {} module{} from {}",
        report.modules.len(),
        if report.modules.len() == 1 { "" } else { "s" },
        report.roots.join(", ")
    ));
    out.newline();

    for module in &report.modules {
        out.plain("  ");
        out.bold(&module.name);
        if module.automatic {
            out.warning(" (automatic)");
        }
        out.plain(" ");
        out.dim(&module.location);
        out.newline();

        if !module.reads.is_empty() {
            out.plain("    reads ");
            out.info(&module.reads.join(", "));
            out.newline();
        }
        if let Some(hash) = &module.hash {
            out.plain("    hash ");
            out.dim(hash);
            out.newline();
        }
    }
}

//! strata command-line tool
//!
//! Resolves modules found on module path directories into a configuration,
//! records dependency hashes, and lists what a module path contains.

mod commands;
mod config;
mod logging;
mod output;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use commands::{ModulePaths, OutputFormat};
use config::StrataConfig;
use logging::{init_logging, LogLevel};
use output::{resolve_color_choice, StyledOutput};
use std::path::PathBuf;
use strata_resolve::HashAlgorithm;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Module resolution toolkit", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (default: nearest strata.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level: off, error, warn, info, debug, trace (RUST_LOG overrides)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Colored output: auto, always, never
    #[arg(long, global = true)]
    color: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone, Default)]
struct PathArgs {
    /// Module path directory, searched after any parent (repeatable)
    #[arg(short = 'p', long = "module-path")]
    module_path: Vec<PathBuf>,

    /// Upgrade path directory, searched first (repeatable)
    #[arg(long = "upgrade-path")]
    upgrade_path: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve root modules and print the configuration
    Resolve {
        /// Root module names (default: resolve.roots from strata.toml)
        roots: Vec<String>,

        #[command(flatten)]
        paths: PathArgs,

        /// Bind service providers after resolving
        #[arg(long)]
        bind: bool,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Include content hashes computed with this algorithm
        #[arg(long)]
        hash_algorithm: Option<String>,

        /// Write the report to a file (.toml or .json) instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Compute the dependency hashes a module should record
    Hash {
        /// Module to hash the dependences of
        module: String,

        #[command(flatten)]
        paths: PathArgs,

        /// Digest algorithm (default: SHA-256)
        #[arg(long)]
        hash_algorithm: Option<String>,

        /// Record the hashes in the module's module.toml
        #[arg(long)]
        write: bool,
    },

    /// List every module found on the module path
    List {
        #[command(flatten)]
        paths: PathArgs,
    },
}

fn main() {
    let cli = Cli::parse();
    let mut out = StyledOutput::new(resolve_color_choice(cli.color.as_deref()));

    if let Err(e) = run(cli, &mut out) {
        out.stderr_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli, out: &mut StyledOutput) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    let level = match cli.log_level.as_deref().or(config.log.level.as_deref()) {
        Some(level) => level.parse::<LogLevel>().map_err(|e| anyhow!(e))?,
        None => LogLevel::default(),
    };
    init_logging(level);

    match cli.command {
        Commands::Resolve {
            roots,
            paths,
            bind,
            format,
            hash_algorithm,
            output,
        } => {
            let paths = module_paths(paths, &config)?;
            let roots = if roots.is_empty() {
                config.resolve.roots.clone()
            } else {
                roots
            };
            let algorithm = hash_algorithm
                .or_else(|| config.resolve.hash_algorithm.clone())
                .map(|name| parse_algorithm(&name))
                .transpose()?;

            let options = commands::resolve::ResolveOptions {
                roots,
                bind: bind || config.resolve.bind.unwrap_or(false),
                format,
                hash_algorithm: algorithm,
                output,
            };
            commands::resolve::execute(&paths, options, out)
        }

        Commands::Hash {
            module,
            paths,
            hash_algorithm,
            write,
        } => {
            let paths = module_paths(paths, &config)?;
            let algorithm = match hash_algorithm.or_else(|| config.resolve.hash_algorithm.clone()) {
                Some(name) => parse_algorithm(&name)?,
                None => HashAlgorithm::default(),
            };
            commands::hash::execute(&paths, &module, algorithm, write, out)
        }

        Commands::List { paths } => {
            let paths = module_paths(paths, &config)?;
            commands::list::execute(&paths, out)
        }
    }
}

/// Load the explicit config file, or the nearest strata.toml if there is one
fn load_config(explicit: Option<&std::path::Path>) -> Result<StrataConfig> {
    if let Some(path) = explicit {
        return StrataConfig::from_file(path);
    }
    let cwd = std::env::current_dir().context("Failed to determine the working directory")?;
    Ok(StrataConfig::discover(&cwd)?
        .map(|(_, config)| config)
        .unwrap_or_default())
}

/// Command-line paths replace the configured ones
fn module_paths(args: PathArgs, config: &StrataConfig) -> Result<ModulePaths> {
    let module_path = if args.module_path.is_empty() {
        config.resolve.module_path.clone()
    } else {
        args.module_path
    };
    let upgrade_path = if args.upgrade_path.is_empty() {
        config.resolve.upgrade_path.clone()
    } else {
        args.upgrade_path
    };

    if module_path.is_empty() && upgrade_path.is_empty() {
        return Err(anyhow!(
            "No module path given; pass --module-path or set resolve.module-path in strata.toml"
        ));
    }

    Ok(ModulePaths {
        upgrade_path,
        module_path,
    })
}

fn parse_algorithm(name: &str) -> Result<HashAlgorithm> {
    name.parse::<HashAlgorithm>()
        .with_context(|| format!("Invalid hash algorithm '{}'", name))
}

//! Command implementations

pub mod hash;
pub mod list;
pub mod resolve;

use clap::ValueEnum;
use std::path::PathBuf;
use std::rc::Rc;
use strata_resolve::{
    Configuration, EmptyFinder, ModuleFinder, ModulePathFinder, ResolutionError,
};

/// Where modules are searched for
#[derive(Debug, Clone)]
pub struct ModulePaths {
    /// Before-finder directories
    pub upgrade_path: Vec<PathBuf>,

    /// After-finder directories
    pub module_path: Vec<PathBuf>,
}

impl ModulePaths {
    /// Build the before and after finders
    pub fn finders(&self) -> (Rc<dyn ModuleFinder>, Rc<dyn ModuleFinder>) {
        (finder_for(&self.upgrade_path), finder_for(&self.module_path))
    }

    /// Resolve `roots` with fresh finders over these paths
    pub fn resolve<I, S>(&self, roots: I) -> Result<Rc<Configuration>, ResolutionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (before, after) = self.finders();
        Configuration::resolve(before, None, after, roots)
    }
}

fn finder_for(entries: &[PathBuf]) -> Rc<dyn ModuleFinder> {
    if entries.is_empty() {
        Rc::new(EmptyFinder)
    } else {
        Rc::new(ModulePathFinder::new(entries.iter().cloned()))
    }
}

/// Output format for `strata resolve`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Toml,
}

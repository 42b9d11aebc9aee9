use std::path::PathBuf;

use crate::{
    list,
    prefix::{normalize_prefix, NormalizePrefixError},
    register,
    registry::Registry,
    store::PrefixStore,
    unregister, EnvironmentName,
};
use clap::{Parser, Subcommand};
use pixi_config::Config;

/// Pixi-conda is a tool for managing conda environments.
#[derive(Subcommand, Debug)]
pub enum Args {
    List(list::Args),
    Register(register::Args),
    Unregister(unregister::Args),
}

pub fn execute(args: Args) -> miette::Result<()> {
    let config = Config::load_global();
    let registry = Registry::from_config(&config);

    match args {
        Args::List(args) => list::execute(&registry, args),
        Args::Register(args) => register::execute(&registry, args),
        Args::Unregister(args) => unregister::execute(&registry, args),
    }
}

/// Selects an environment either by name or by its prefix.
#[derive(Parser, Debug)]
#[clap(group(clap::ArgGroup::new("target").required(true).args(["name", "prefix"])))]
pub struct TargetArgs {
    /// Name of environment.
    #[clap(
        long,
        short,
        help_heading = "Target Environment Specification",
        conflicts_with = "prefix"
    )]
    pub name: Option<EnvironmentName>,

    /// Path to environment location (i.e. prefix).
    #[clap(long, short, help_heading = "Target Environment Specification")]
    pub prefix: Option<PathBuf>,
}

impl TargetArgs {
    /// Returns the normalized prefix of the selected environment, i.e. the
    /// path as it is stored in the registry.
    pub fn resolve<S: PrefixStore>(
        &self,
        registry: &Registry<S>,
    ) -> Result<PathBuf, NormalizePrefixError> {
        let prefix = match (&self.name, &self.prefix) {
            (Some(name), _) => registry.prefix_for_name(name),
            (None, Some(prefix)) => prefix.clone(),
            (None, None) => unreachable!("Either a name or a prefix must be provided"),
        };
        normalize_prefix(&prefix)
    }
}

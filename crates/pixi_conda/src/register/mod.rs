use clap::Parser;
use pixi_consts::consts;

use crate::{cli::TargetArgs, prefix::inspect, registry::Registry, store::PrefixStore};

/// Add an environment to the list of known environments.
///
/// The environment does not have to exist yet. Prefixes that do not contain
/// `conda-meta/history` are forgotten the next time environments are listed.
#[derive(Parser, Debug)]
#[clap(verbatim_doc_comment)]
pub struct Args {
    #[clap(flatten)]
    pub(crate) target: TargetArgs,
}

pub fn execute<S: PrefixStore>(registry: &Registry<S>, args: Args) -> miette::Result<()> {
    let prefix = args.target.resolve(registry)?;
    let inserted = registry.register_env(&prefix)?;
    let is_environment = inspect(&prefix).is_environment();

    let prefix = consts::PREFIX_STYLE.apply_to(prefix.display());
    if inserted {
        eprintln!(
            "{}Registered {prefix}",
            console::style(console::Emoji("✔ ", "")).green()
        );
    } else {
        eprintln!("{prefix} is already registered");
    }

    if !is_environment {
        tracing::warn!(
            "{prefix} is not a conda environment yet and will be forgotten unless it becomes one"
        );
    }

    Ok(())
}

use clap::Parser;
use pixi_consts::consts;

use crate::{cli::TargetArgs, registry::Registry, store::PrefixStore, UnregisterOutcome};

/// Remove an environment from the list of known environments.
///
/// Environments whose `conda-meta` directory contains more than the history
/// file are still in use and stay registered.
#[derive(Parser, Debug)]
#[clap(verbatim_doc_comment)]
pub struct Args {
    #[clap(flatten)]
    pub(crate) target: TargetArgs,
}

pub fn execute<S: PrefixStore>(registry: &Registry<S>, args: Args) -> miette::Result<()> {
    let prefix = args.target.resolve(registry)?;
    let outcome = registry.unregister_env(&prefix)?;

    let prefix = consts::PREFIX_STYLE.apply_to(prefix.display());
    match outcome {
        UnregisterOutcome::Removed => eprintln!(
            "{}Unregistered {prefix}",
            console::style(console::Emoji("✔ ", "")).green()
        ),
        UnregisterOutcome::NotRegistered => eprintln!("{prefix} was not registered"),
        UnregisterOutcome::Pinned => tracing::warn!(
            "{prefix} stays registered because its conda-meta directory is not empty"
        ),
    }

    Ok(())
}

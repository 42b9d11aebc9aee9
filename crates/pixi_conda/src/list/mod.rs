use std::io::Write;

use clap::Parser;
use miette::IntoDiagnostic;
use pixi_consts::consts;
use serde::Serialize;
use tabwriter::TabWriter;

use crate::{registry::Registry, store::PrefixStore, KnownEnvironment};

/// List all known conda environments.
///
/// Environments are either found in the environments directory or were
/// registered by their prefix. Registered prefixes that are no longer conda
/// environments are forgotten.
#[derive(Parser, Debug)]
#[clap(verbatim_doc_comment)]
pub struct Args {
    /// Output the environments as json.
    #[clap(long, help_heading = "Output, Prompt, and Flow Control Options")]
    pub(crate) json: bool,
}

#[derive(Serialize)]
struct EnvironmentList<'a> {
    environments: &'a [KnownEnvironment],
}

pub fn execute<S: PrefixStore>(registry: &Registry<S>, args: Args) -> miette::Result<()> {
    let environments = registry.all_environments()?;

    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();
    if args.json {
        let json = serde_json::to_string_pretty(&EnvironmentList {
            environments: &environments,
        })
        .into_diagnostic()?;
        writeln!(stdout, "{json}").into_diagnostic()?;
    } else {
        render_table(&environments, &mut stdout).into_diagnostic()?;
    }

    Ok(())
}

/// Writes the environments as a tab aligned table.
fn render_table(environments: &[KnownEnvironment], writer: impl Write) -> std::io::Result<()> {
    let mut writer = TabWriter::new(writer).ansi(true);
    writeln!(
        writer,
        "{}\t{}",
        console::style("Name").bold(),
        console::style("Prefix").bold()
    )?;
    for environment in environments {
        let name = environment
            .name
            .as_ref()
            .map(|name| consts::ENVIRONMENT_STYLE.apply_to(name).to_string())
            .unwrap_or_default();
        writeln!(
            writer,
            "{name}\t{}",
            consts::PREFIX_STYLE.apply_to(environment.prefix.display())
        )?;
    }
    writer.flush()
}

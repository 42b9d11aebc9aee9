use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use tracing_subscriber::EnvFilter;

/// Keeps track of the conda environments on this machine.
#[derive(Parser, Debug)]
#[clap(version, arg_required_else_help = true)]
struct Cli {
    #[clap(subcommand)]
    command: pixi_conda::cli::Args,

    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();

    // `RUST_LOG` takes precedence over the verbosity flags.
    let env_filter = EnvFilter::builder()
        .with_default_directive(cli.verbose.tracing_level_filter().into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();

    pixi_conda::cli::execute(cli.command)
}

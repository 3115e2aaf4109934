use clap::Parser;

mod commands;
mod execute;
mod workers;

use commands::{Commands, RunArgs};

#[derive(Parser)]
#[command(name = "graced")]
#[command(about = "Demo service that shuts down gracefully on SIGINT/SIGTERM", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    grace_utils::init().map_err(|e| eyre::eyre!("failed to initialise tracing: {e}"))?;

    let cli = Cli::parse();

    // Default behavior when no command is specified
    cli.command
        .unwrap_or_else(|| Commands::Run(RunArgs::default()))
        .execute()
}

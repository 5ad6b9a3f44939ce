// pipewright/src/main.rs

mod cli;
mod commands;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 1. Setup Logging (Tracing)
    // RUST_LOG=debug pipewright run ... overrides -v
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run { name, json } => commands::run::execute(&cli.project_dir, &name, json).await,
        Commands::Schedule { name } => commands::schedule::execute(&cli.project_dir, &name).await,
        Commands::List => commands::list::execute(&cli.project_dir),
        Commands::Check => commands::check::execute(&cli.project_dir),
    }
}

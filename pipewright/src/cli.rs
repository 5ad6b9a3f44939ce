// pipewright/src/cli.rs
//
// Single source of truth for all CLI definitions (Clap structs).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pipewright")]
#[command(about = "Configuration-driven ETL runner", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Project directory (holds pipewright.yaml and the document folders)
    #[arg(long, global = true, env = "PIPEWRIGHT_PROJECT_DIR", default_value = ".")]
    pub project_dir: PathBuf,

    /// Raise log verbosity to debug (RUST_LOG still wins)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 🚀 Runs one pipeline (read -> transform -> load)
    Run {
        /// Pipeline name
        name: String,

        /// Print the run summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// 🗓️  Runs every pipeline of a schedule, in order
    Schedule {
        /// Schedule name (file stem of the schedule document)
        name: String,
    },

    /// 📋 Lists enabled pipelines, schedules and connections
    List,

    /// 🩺 Validates every pipeline's setup without touching any data
    Check,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, bail};
    use clap::Parser;

    #[test]
    fn test_cli_parse_run_defaults() -> Result<()> {
        let args = Cli::try_parse_from(["pipewright", "run", "daily_sales"])?;
        assert_eq!(args.project_dir.to_string_lossy(), ".");
        assert!(!args.verbose);
        match args.command {
            Commands::Run { name, json } => {
                assert_eq!(name, "daily_sales");
                assert!(!json);
                Ok(())
            }
            _ => bail!("Expected Run command"),
        }
    }

    #[test]
    fn test_cli_parse_global_flags_after_subcommand() -> Result<()> {
        let args = Cli::try_parse_from([
            "pipewright",
            "schedule",
            "nightly",
            "--project-dir",
            "/srv/etl",
            "-v",
        ])?;
        assert_eq!(args.project_dir.to_string_lossy(), "/srv/etl");
        assert!(args.verbose);
        match args.command {
            Commands::Schedule { name } => {
                assert_eq!(name, "nightly");
                Ok(())
            }
            _ => bail!("Expected Schedule command"),
        }
    }

    #[test]
    fn test_cli_run_requires_name() {
        assert!(Cli::try_parse_from(["pipewright", "run"]).is_err());
    }
}

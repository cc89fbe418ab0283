//! CLI entry point for the MAPF decomposition sweep harness.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use mapf::search::AStarSolver;
use sweep::config::load_config;
use sweep::driver::SweepDriver;
use sweep::metrics::RunningTotals;

#[derive(Parser)]
#[command(
    name = "sweep",
    version,
    about = "Bidirectional-decomposition sweep harness for MAPF instances"
)]
struct Cli {
    /// Sweep configuration file (missing file means built-in defaults).
    #[arg(long, default_value = "sweep.toml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run (or resume) the configured parameter sweep.
    Run,
    /// Run a single instance from the instances directory.
    RunInstance { name: String },
    /// Print the totals persisted by a previous run.
    Summary,
}

fn main() {
    mapf::logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    match cli.command {
        Command::Run => {
            let mut driver = SweepDriver::new(config, AStarSolver)?;
            driver.run()?;
            println!("{}", driver.totals().render());
            Ok(())
        }
        Command::RunInstance { name } => {
            let mut driver = SweepDriver::new(config, AStarSolver)?;
            driver.run_single(&name)?;
            Ok(())
        }
        Command::Summary => {
            let totals = RunningTotals::load_summary(&config.summary_file)?;
            println!("{}", totals.render());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_run() {
        let cli = Cli::parse_from(["sweep", "run"]);
        assert!(matches!(cli.command, Command::Run));
        assert_eq!(cli.config, PathBuf::from("sweep.toml"));
    }

    #[test]
    fn parse_run_instance_with_config_override() {
        let cli = Cli::parse_from([
            "sweep",
            "--config",
            "custom.toml",
            "run-instance",
            "Instance-10-10-3-0",
        ]);
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
        assert!(matches!(cli.command, Command::RunInstance { name } if name == "Instance-10-10-3-0"));
    }
}

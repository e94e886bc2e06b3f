mod aggregate;
mod config;
mod console;
mod gateway;
mod orchestrator;
mod providers;
mod report;
mod strategies;
mod types;

use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;
use crate::console::Console;
use crate::orchestrator::Orchestrator;
use crate::strategies::ArchitectureKind;

#[derive(Debug, Parser)]
struct Args {
    /// Path to a text file holding the problem statement
    #[arg(long, default_value = "problem.txt")]
    problem: PathBuf,

    /// Deliberation architecture to run
    #[arg(long, value_enum, default_value = "democracy")]
    architecture: ArchitectureKind,

    /// Output directory for artifacts
    #[arg(long, default_value = "out")]
    out_dir: PathBuf,

    /// Read the problem interactively instead of from a file
    #[arg(long, default_value_t = false)]
    interactive: bool,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    // logging
    let filter_layer = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter_layer).init();

    // startup information
    tracing::info!("Starting the Model Council application");

    // credentials and knobs from env; a missing key aborts here, before any
    // deliberation starts
    let config = Config::load()?;
    let orchestrator = Orchestrator::new(&config)?;

    Console::display_welcome();

    let problem = if args.interactive {
        match Console::collect_problem().await? {
            Some(problem) => problem,
            None => return Ok(()),
        }
    } else {
        let raw = tokio::fs::read_to_string(&args.problem)
            .await
            .with_context(|| {
                format!("Failed to read the problem file {}", args.problem.display())
            })?;
        let problem = raw.trim().to_string();
        ensure!(
            !problem.is_empty(),
            "The problem file {} is empty",
            args.problem.display()
        );
        problem
    };

    if let Err(error) = orchestrator
        .run(args.architecture, &problem, &args.out_dir)
        .await
    {
        Console::display_error(&error);
        std::process::exit(1);
    }
    Ok(())
}

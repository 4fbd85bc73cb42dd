// ABOUTME: Entry point for the cpi-deploy CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use cpi_deploy::config::UserConfig;
use cpi_deploy::error::Result;
use cpi_deploy::output::Output;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = cli.output;
    if let Err(e) = run(cli).await {
        Output::new(mode).error(&e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => UserConfig::default_path()?,
    };
    let output = Output::new(cli.output);

    match cli.command {
        Commands::Deployment { manifest } => {
            commands::deployment(&config_path, manifest.as_deref(), &output)
        }
        Commands::Delete { args } => commands::delete(&config_path, &args, output).await,
    }
}

// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use cpi_deploy::output::OutputMode;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cpi-deploy")]
#[command(about = "Install a CPI release and tear down a cloud deployment")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the user config file (default: ~/.cpi-deploy/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "normal")]
    pub output: OutputMode,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set or show the deployment manifest to operate on
    Deployment {
        /// Path to the deployment manifest
        manifest: Option<PathBuf>,
    },

    /// Delete the current deployment using a CPI release
    Delete {
        /// CPI release tarball
        #[arg(num_args = 0.., allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

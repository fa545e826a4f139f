//! CLI argument parsing for the routeopt-worker binary.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "routeopt-worker", about = "Single-vehicle route optimization worker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the worker server (default if no subcommand given)
    Serve,
    /// Optimize one request read from a JSON file and print the result
    Optimize {
        /// Path to an optimize request JSON file
        file: PathBuf,
        /// Use the local template explanation instead of the configured service
        #[arg(long)]
        no_explain: bool,
    },
}

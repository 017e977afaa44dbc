//! versakv CLI
//!
//! Command-line driver for the versakv engine.
//!
//! # Commands
//!
//! - `demo` - Run the reference transaction scenarios
//! - `inspect` - Display the saved snapshots of a data directory
//! - `version` - Show version information

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// versakv command-line tools.
#[derive(Parser)]
#[command(name = "versakv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the data directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the reference scenarios (in memory unless --path is given)
    Demo,

    /// Display saved version chains and transaction state
    Inspect {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Demo => {
            commands::demo::run(cli.path.as_deref())?;
        }
        Commands::Inspect { format } => {
            let path = cli.path.ok_or("Data directory path required for inspect")?;
            commands::inspect::run(&path, &format)?;
        }
        Commands::Version => {
            println!("versakv CLI v{}", env!("CARGO_PKG_VERSION"));
            println!(
                "snapshot format v{}",
                versakv_core::persist::SNAPSHOT_VERSION
            );
        }
    }

    Ok(())
}

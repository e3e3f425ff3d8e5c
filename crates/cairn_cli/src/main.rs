//! Cairn CLI
//!
//! Command-line tools for Cairn database directories.
//!
//! # Commands
//!
//! - `checkpoint` - Create an openable point-in-time copy of a database
//! - `inspect` - List and classify the files of a database or checkpoint

mod commands;

use clap::{Parser, Subcommand};
use commands::OutputFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Cairn command-line database tools.
#[derive(Parser)]
#[command(name = "cairn")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the database directory
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
    /// Create a checkpoint of a database that is not open elsewhere
    Checkpoint {
        /// Directory to create; must not exist
        target: PathBuf,

        /// Directory holding the log segments, if not the database directory
        #[arg(long)]
        wal_dir: Option<PathBuf>,

        /// Sync copied files with full metadata
        #[arg(long)]
        use_fsync: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List and classify the files of a database or checkpoint
    Inspect {
        /// Directory to inspect (defaults to --path)
        dir: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
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
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Checkpoint {
            target,
            wal_dir,
            use_fsync,
            format,
        } => {
            let path = cli.path.ok_or("Database path required for checkpoint")?;
            commands::checkpoint::run(&path, wal_dir.as_deref(), &target, use_fsync, format)?;
        }
        Commands::Inspect { dir, format } => {
            let path = dir
                .or(cli.path)
                .ok_or("Directory required for inspect")?;
            commands::inspect::run(&path, format)?;
        }
        Commands::Version => {
            println!("Cairn CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Cairn Core v{}", cairn_core::VERSION);
        }
    }

    Ok(())
}

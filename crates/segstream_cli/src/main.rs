//! SegStream CLI
//!
//! Command-line tools for segmented stream containers.
//!
//! # Commands
//!
//! - `ingest` - Write files into a new container, one entry per file
//! - `inspect` - Display container sizes, entries and segments
//! - `cat` - Print one entry or one segment
//! - `verify` - Check the indexes against the data stream

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Segmented stream container tools.
#[derive(Parser)]
#[command(name = "segstream")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the container files
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
    /// Write files into a new container, one entry per file
    Ingest {
        /// Container id
        id: String,

        /// Input files, in entry order
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Bytes searched for an XML declaration
        #[arg(long, default_value_t = segstream_core::DEFAULT_XML_LOOKAHEAD)]
        lookahead: usize,

        /// Skip the exclusive lock on the data file
        #[arg(long)]
        no_lock: bool,
    },

    /// Display container sizes, entries and segments
    Inspect {
        /// Container id
        id: String,

        /// List every segment of every entry
        #[arg(short, long)]
        segments: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print one entry or one segment to stdout
    Cat {
        /// Container id
        id: String,

        /// Entry ordinal (zero-based)
        #[arg(short, long)]
        entry: u64,

        /// Segment ordinal within the entry (zero-based)
        #[arg(short, long)]
        segment: Option<u64>,
    },

    /// Check the indexes against the data stream
    Verify {
        /// Container id
        id: String,
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
        Commands::Ingest {
            id,
            files,
            lookahead,
            no_lock,
        } => {
            let path = cli.path.ok_or("Container directory required for ingest")?;
            commands::ingest::run(&path, &id, &files, lookahead, !no_lock)?;
        }
        Commands::Inspect {
            id,
            segments,
            format,
        } => {
            let path = cli.path.ok_or("Container directory required for inspect")?;
            commands::inspect::run(&path, &id, segments, &format)?;
        }
        Commands::Cat { id, entry, segment } => {
            let path = cli.path.ok_or("Container directory required for cat")?;
            commands::cat::run(&path, &id, entry, segment)?;
        }
        Commands::Verify { id } => {
            let path = cli.path.ok_or("Container directory required for verify")?;
            commands::verify::run(&path, &id)?;
        }
        Commands::Version => {
            println!("SegStream CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("SegStream Core v{}", segstream_core::VERSION);
        }
    }

    Ok(())
}

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "picvault")]
#[command(author, version, about = "Picture store with a consistent metadata index")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Store a picture file
    Put {
        /// Picture file to upload
        #[arg(required = true)]
        file: PathBuf,

        /// Session to store the picture under (session mode only)
        #[arg(long)]
        session: Option<String>,
    },

    /// Fetch a picture by id, or the most recent one
    Get {
        /// Picture id or "latest"
        #[arg(default_value = "latest")]
        target: String,

        /// Write the bytes here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List stored pictures
    List {
        /// Session whose gallery to list (session mode only)
        #[arg(long)]
        session: Option<String>,
    },

    /// Delete a picture by id, or the most recent one
    Delete {
        /// Picture id or "latest"
        #[arg(default_value = "latest")]
        target: String,
    },

    /// Remove blobs no picture references
    Sweep {
        /// Report orphans without removing them
        #[arg(long)]
        dry_run: bool,

        /// Ignore blobs modified within this many seconds
        #[arg(long, default_value = "3600")]
        grace_secs: u64,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

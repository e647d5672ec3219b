use clap::{Parser, Subcommand};
use scout_core::Strategy;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "apkscout")]
#[command(author, version, about = "Concurrent apk package metadata fetcher")]
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
    /// List installable packages, version suffix stripped
    List {
        /// Only show packages whose name contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Show what a single package provides
    Provides {
        /// Package name
        #[arg(required = true)]
        package: String,
    },

    /// Fetch provides metadata for every package concurrently
    Fetch {
        /// Dispatch strategy (streaming-queue or static-partition)
        #[arg(short, long)]
        strategy: Option<Strategy>,

        /// Number of worker threads (overrides the core-count policy)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Give up on a single lookup after this many seconds
        #[arg(long, value_name = "SECS")]
        call_timeout: Option<u64>,

        /// Only fetch packages whose name contains this text
        #[arg(short, long)]
        filter: Option<String>,

        /// Cancel the run if it has not finished after this many seconds
        #[arg(long, value_name = "SECS")]
        cancel_after: Option<f64>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

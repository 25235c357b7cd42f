use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Watches an application folder for iOS bundles.
///
/// New `.app`/`.ipa` bundles are registered as supported applications; `.zip`
/// archives dropped into the folder are expanded in place so their bundles
/// are picked up on the next pass.
#[derive(Parser, Debug)]
#[command(
    name = "bundle-watch",
    version,
    about,
    long_about = None,
    propagate_version = true,
)]
pub struct Cli {
    /// Log at debug level (overrides RUST_LOG and the config file).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file (defaults to ./bundle-watch.toml when present).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sweep the folder, then keep watching it until Ctrl-C or until it disappears.
    ///
    /// Prints the registered applications on exit.
    Watch {
        /// Folder to monitor.
        dir: PathBuf,

        /// Sleep between polls when nothing changed, in milliseconds.
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Output results as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },

    /// Run the startup sweep once and print what it found.
    ///
    /// Archives are expanded, but their bundles are only registered by a
    /// later sweep or by `watch`.
    Sweep {
        /// Folder to sweep.
        dir: PathBuf,

        /// Output results as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },

    /// Print how each path would be classified (application, archive, irrelevant).
    Classify {
        /// Paths to classify. They do not need to exist.
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Output results as JSON instead of human-readable text.
        #[arg(long)]
        json: bool,
    },
}

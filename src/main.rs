mod adapters;
mod classify;
mod cli;
mod config;
mod monitor;
mod output;
mod watcher;

use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use adapters::{AppRegistry, ZipExpander};
use classify::Category;
use cli::{Cli, Commands};
use config::MonitorConfig;
use monitor::{FolderMonitor, MonitorOptions};
use output::{Classified, RunReport, print_classified, print_report};

/// Install the stderr subscriber. Precedence: `--verbose`, then the config
/// file's `log`, then `RUST_LOG`, then `info`.
fn init_tracing(verbose: bool, directive: Option<&str>) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else if let Some(directive) = directive {
        EnvFilter::try_new(directive).unwrap_or_else(|err| {
            eprintln!("warning: invalid log directive {directive:?}: {err}. Using info.");
            EnvFilter::new("info")
        })
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = MonitorConfig::load(cli.config.as_deref());
    init_tracing(cli.verbose, config.log.as_deref());

    match cli.command {
        Commands::Watch {
            dir,
            interval_ms,
            json,
        } => {
            let registry = Arc::new(AppRegistry::new());
            let options =
                MonitorOptions::new(&dir).poll_interval(config.poll_interval(interval_ms));
            let monitor =
                FolderMonitor::new(options, registry.clone(), Arc::new(ZipExpander::new()))
                    .with_context(|| format!("cannot monitor {}", dir.display()))?;
            let watched = monitor.dir().to_path_buf();

            let (handle, sweep) = monitor
                .start()
                .await
                .with_context(|| format!("startup sweep of {} failed", watched.display()))?;

            tokio::select! {
                res = tokio::signal::ctrl_c() => {
                    match res {
                        Ok(()) => info!("interrupted, stopping"),
                        Err(err) => warn!(%err, "cannot listen for Ctrl-C, stopping"),
                    }
                    handle.stop();
                }
                _ = handle.wait_stopped() => {}
            }
            info!(state = ?handle.state(), applications = registry.len(), "shutting down");
            handle.join().await;

            print_report(
                &RunReport {
                    dir: watched,
                    sweep,
                    applications: registry.applications(),
                },
                json,
            );
        }

        Commands::Sweep { dir, json } => {
            let registry = Arc::new(AppRegistry::new());
            let monitor = FolderMonitor::new(
                MonitorOptions::new(&dir),
                registry.clone(),
                Arc::new(ZipExpander::new()),
            )
            .with_context(|| format!("cannot monitor {}", dir.display()))?;
            let sweep = monitor
                .sweep()
                .await
                .with_context(|| format!("sweep of {} failed", dir.display()))?;

            print_report(
                &RunReport {
                    dir: monitor.dir().to_path_buf(),
                    sweep,
                    applications: registry.applications(),
                },
                json,
            );
        }

        Commands::Classify { paths, json } => {
            let results: Vec<Classified> = paths
                .into_iter()
                .map(|path| Classified {
                    category: Category::of(&path),
                    path,
                })
                .collect();
            print_classified(&results, json);
        }
    }

    Ok(())
}

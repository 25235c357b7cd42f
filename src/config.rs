use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::monitor::DEFAULT_POLL_INTERVAL;

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE: &str = "bundle-watch.toml";

/// Intervals below this would just spin.
const MIN_POLL_INTERVAL_MS: u64 = 10;

/// Configuration loaded from `bundle-watch.toml`.
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MonitorConfig {
    /// Sleep between polls when nothing happened, in milliseconds.
    pub poll_interval_ms: Option<u64>,
    /// `tracing` filter directive, e.g. `"bundle_watch=debug"`.
    pub log: Option<String>,
}

impl MonitorConfig {
    /// Load configuration from `path`, or from [`CONFIG_FILE`] in the current
    /// directory when `path` is `None`.
    ///
    /// Returns a default (empty) configuration if the file does not exist or
    /// cannot be parsed. Runs before logging is set up, so problems go
    /// straight to stderr.
    pub fn load(path: Option<&Path>) -> Self {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE));

        if !config_path.exists() {
            if path.is_some() {
                eprintln!(
                    "warning: {} not found. Using defaults.",
                    config_path.display()
                );
            }
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    eprintln!(
                        "warning: failed to parse {}: {err}. Using defaults.",
                        config_path.display()
                    );
                    Self::default()
                }
            },
            Err(err) => {
                eprintln!(
                    "warning: failed to read {}: {err}. Using defaults.",
                    config_path.display()
                );
                Self::default()
            }
        }
    }

    /// Effective polling interval: `override_ms` wins over the file value.
    pub fn poll_interval(&self, override_ms: Option<u64>) -> Duration {
        override_ms
            .or(self.poll_interval_ms)
            .map(|ms| Duration::from_millis(ms.max(MIN_POLL_INTERVAL_MS)))
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    }
}

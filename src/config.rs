//! Layered settings: optional TOML file, then `SPACEWX_*` environment
//! variables, then command line flags (applied by the binary).

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use spacewx_feeds::noaa::{DEFAULT_KP_URL, DEFAULT_PLASMA_URL};
use spacewx_live::FeedPolicy;

use crate::duration::parse_duration;

/// Prefix for environment overrides, e.g. `SPACEWX_MONITOR__INTERVAL=30s`.
pub const ENV_PREFIX: &str = "SPACEWX";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub monitor: MonitorSettings,
    pub feeds: FeedSettings,
    pub output: OutputSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorSettings {
    /// Refresh interval as a duration string.
    pub interval: String,
    /// "joined" or "independent".
    pub policy: String,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: "60s".to_string(),
            policy: FeedPolicy::default().to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    pub kp_url: String,
    pub plasma_url: String,
    pub timeout: String,

    /// Read the Kp table from this file instead of the network.
    pub kp_file: Option<PathBuf>,

    /// Read the plasma table from this file instead of the network.
    pub plasma_file: Option<PathBuf>,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            kp_url: DEFAULT_KP_URL.to_string(),
            plasma_url: DEFAULT_PLASMA_URL.to_string(),
            timeout: "10s".to_string(),
            kp_file: None,
            plasma_file: None,
        }
    }
}

impl FeedSettings {
    /// Both offline files, if configured.
    pub fn files(&self) -> Option<(&Path, &Path)> {
        match (&self.kp_file, &self.plasma_file) {
            (Some(kp), Some(plasma)) => Some((kp.as_path(), plasma.as_path())),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Rewrite this JSON file after every update.
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from an optional config file layered under the
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("Failed to load configuration")?;

        config
            .try_deserialize()
            .context("Invalid configuration")
    }

    pub fn interval(&self) -> Result<Duration> {
        parse_duration(&self.monitor.interval)
            .with_context(|| format!("Invalid monitor.interval '{}'", self.monitor.interval))
    }

    pub fn policy(&self) -> Result<FeedPolicy> {
        Ok(self.monitor.policy.parse::<FeedPolicy>()?)
    }

    pub fn timeout(&self) -> Result<Duration> {
        parse_duration(&self.feeds.timeout)
            .with_context(|| format!("Invalid feeds.timeout '{}'", self.feeds.timeout))
    }

    /// Check every value that is parsed lazily.
    pub fn validate(&self) -> Result<()> {
        self.interval()?;
        self.policy()?;
        self.timeout()?;
        if self.feeds.kp_file.is_some() != self.feeds.plasma_file.is_some() {
            anyhow::bail!("feeds.kp_file and feeds.plasma_file must be set together");
        }
        Ok(())
    }
}

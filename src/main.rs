use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use spacewx::duration::format_duration;
use spacewx::report;
use spacewx::Settings;
use spacewx_feeds::noaa::NoaaClient;
use spacewx_feeds::{FeedSource, FileFeeds};
use spacewx_live::{Event, EventBus, LiveMonitor, Output, RefreshOutcome, Topic};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "spacewx")]
#[command(about = "Live space weather monitor for the NOAA SWPC Kp and solar wind feeds")]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Refresh interval (e.g., "60s", "500ms", "2m")
    #[arg(short, long)]
    interval: Option<String>,

    /// Partial failure policy: "joined" or "independent"
    #[arg(long)]
    policy: Option<String>,

    /// Refresh once, print the readout and exit
    #[arg(long, conflicts_with = "export")]
    once: bool,

    /// Refresh once and write the JSON snapshot to this file
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// Tracing filter (overrides RUST_LOG and the config file)
    #[arg(long)]
    log_level: Option<String>,

    /// Read the Kp table from a file instead of NOAA
    #[arg(long, requires = "plasma_file")]
    kp_file: Option<PathBuf>,

    /// Read the plasma table from a file instead of NOAA
    #[arg(long, requires = "kp_file")]
    plasma_file: Option<PathBuf>,
}

impl Args {
    /// Command line flags take precedence over file and environment.
    fn apply(&self, settings: &mut Settings) {
        if let Some(interval) = &self.interval {
            settings.monitor.interval = interval.clone();
        }
        if let Some(policy) = &self.policy {
            settings.monitor.policy = policy.clone();
        }
        if let Some(level) = &self.log_level {
            settings.log.level = level.clone();
        }
        if self.kp_file.is_some() {
            settings.feeds.kp_file = self.kp_file.clone();
            settings.feeds.plasma_file = self.plasma_file.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    args.apply(&mut settings);
    init_tracing(&settings, args.log_level.is_some());
    settings.validate()?;

    let monitor = match settings.feeds.files() {
        Some((kp, plasma)) => build_monitor(FileFeeds::new(kp, plasma), &settings)?,
        None => {
            let client = NoaaClient::builder()
                .kp_url(&settings.feeds.kp_url)
                .plasma_url(&settings.feeds.plasma_url)
                .timeout(settings.timeout()?)
                .build()?;
            build_monitor(client, &settings)?
        }
    };

    // Handle export mode (non-interactive)
    if let Some(export_path) = &args.export {
        return export_to_file(&monitor, export_path).await;
    }

    if args.once {
        return run_once(&monitor).await;
    }

    run_until_interrupted(monitor).await
}

fn init_tracing(settings: &Settings, from_flag: bool) {
    let from_env = if from_flag {
        None
    } else {
        std::env::var(EnvFilter::DEFAULT_ENV).ok()
    };
    let directive = from_env.as_deref().unwrap_or(&settings.log.level);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
}

fn build_monitor(source: impl FeedSource + 'static, settings: &Settings) -> Result<LiveMonitor> {
    let mut builder = LiveMonitor::builder()
        .source(source)
        .interval(settings.interval()?)
        .policy(settings.policy()?);

    if let Some(path) = &settings.output.file {
        builder = builder.output(Output::file(path));
    }

    Ok(builder.build()?)
}

/// Refresh once and report the outcome through the exit status
async fn run_once(monitor: &LiveMonitor) -> Result<()> {
    let outcome = monitor.refresh().await;
    println!("{}", report::readout(&monitor.snapshot(), None));

    match outcome {
        RefreshOutcome::Updated => Ok(()),
        RefreshOutcome::Failed(message) => bail!("Refresh failed: {}", message),
        other => bail!("Refresh did not complete: {:?}", other),
    }
}

/// Export a freshly refreshed snapshot to a JSON file
async fn export_to_file(monitor: &LiveMonitor, export_path: &Path) -> Result<()> {
    if let RefreshOutcome::Failed(message) = monitor.refresh().await {
        bail!("Refresh failed, nothing exported: {}", message);
    }

    let json = report::to_json(&monitor.snapshot())?;
    std::fs::write(export_path, json)
        .with_context(|| format!("Failed to write {}", export_path.display()))?;

    println!("Exported live state to: {}", export_path.display());
    Ok(())
}

/// Refresh on the interval until Ctrl-C, printing a readout per update
async fn run_until_interrupted(monitor: LiveMonitor) -> Result<()> {
    let bus = EventBus::new();

    let readouts = monitor.clone();
    bus.subscribe(Topic::LiveUpdate, move |event| {
        if let Event::LiveUpdate(state) = event {
            println!("{}", report::readout(state, Some(&readouts.trend())));
        }
    });

    bus.subscribe(Topic::SeverityChange, |event| {
        if let Event::SeverityChange { from, to, severity } = event {
            info!(%from, %to, severity, "severity level changed");
        }
    });

    let stale = monitor.clone();
    bus.subscribe(Topic::FeedError, move |event| {
        if let Event::FeedError(message) = event {
            warn!(error = %message, "showing stale data");
            println!("{}", report::readout(&stale.snapshot(), None));
        }
    });

    bus.connect(monitor.subscribe());
    info!(
        source = monitor.source_description(),
        interval = %format_duration(monitor.interval()),
        "watching space weather (Ctrl-C to stop)"
    );
    let handle = monitor.start();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    info!("shutting down");
    handle.shutdown().await;
    bus.disconnect();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn flags_override_settings() {
        let args = Args::try_parse_from([
            "spacewx",
            "--interval",
            "30s",
            "--policy",
            "independent",
            "--kp-file",
            "kp.json",
            "--plasma-file",
            "plasma.json",
        ])
        .unwrap();

        let mut settings = Settings::default();
        args.apply(&mut settings);

        assert_eq!(settings.monitor.interval, "30s");
        assert_eq!(settings.monitor.policy, "independent");
        assert!(settings.feeds.files().is_some());
        settings.validate().unwrap();
    }

    #[test]
    fn offline_files_must_come_in_pairs() {
        assert!(Args::try_parse_from(["spacewx", "--kp-file", "kp.json"]).is_err());
    }

    #[test]
    fn once_and_export_are_exclusive() {
        assert!(Args::try_parse_from(["spacewx", "--once", "--export", "out.json"]).is_err());
    }

    #[tokio::test]
    async fn export_writes_snapshot_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let kp = dir.path().join("kp.json");
        let plasma = dir.path().join("plasma.json");
        let out = dir.path().join("live.json");
        std::fs::write(&kp, r#"[["time_tag","Kp"],["2024-01-01T00:00Z","2"]]"#).unwrap();
        std::fs::write(
            &plasma,
            r#"[["time_tag","density","speed","temperature"],["2024-01-01T00:00Z","5","420","90000"]]"#,
        )
        .unwrap();

        let monitor = build_monitor(FileFeeds::new(&kp, &plasma), &Settings::default()).unwrap();
        export_to_file(&monitor, &out).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(written["kpNow"], 2.0);
        assert_eq!(written["solarWindSpeed"], 420.0);
        assert_eq!(written["loading"], false);
    }

    #[tokio::test]
    async fn once_fails_when_feeds_are_missing() {
        let monitor = build_monitor(
            FileFeeds::new("/nonexistent/kp.json", "/nonexistent/plasma.json"),
            &Settings::default(),
        )
        .unwrap();
        assert!(run_once(&monitor).await.is_err());
        assert!(monitor.snapshot().error.is_some());
    }
}

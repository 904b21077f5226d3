//! The live monitor: periodic refresh of both feeds into one published state.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use spacewx_feeds::FeedSource;
use spacewx_types::LiveState;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::output::Output;
use crate::state::{RefreshOutcome, Shared, Tick};
use crate::trend::SeverityTrend;

/// Refresh interval used when none is configured.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(60);

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// How a tick treats one feed failing while the other succeeds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FeedPolicy {
    /// All or nothing: if either feed fails, neither is applied.
    #[default]
    Joined,

    /// Each feed's portion is applied on its own; `error` names only the
    /// feed that failed.
    Independent,
}

impl FeedPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedPolicy::Joined => "joined",
            FeedPolicy::Independent => "independent",
        }
    }
}

impl fmt::Display for FeedPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeedPolicy {
    type Err = MonitorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "joined" => Ok(FeedPolicy::Joined),
            "independent" => Ok(FeedPolicy::Independent),
            other => Err(MonitorError::UnknownPolicy(other.to_string())),
        }
    }
}

/// Errors from configuring a monitor.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("no feed source configured")]
    MissingSource,

    #[error("unknown feed policy '{0}' (expected 'joined' or 'independent')")]
    UnknownPolicy(String),
}

/// Keeps a [`LiveState`] current by polling a [`FeedSource`].
///
/// Every tick fetches both feeds concurrently and publishes a complete new
/// snapshot. Consumers read it through [`LiveMonitor::subscribe`] or
/// [`LiveMonitor::snapshot`]; they never see a failure directly, only the
/// `error` field of the snapshot.
///
/// Cloning a monitor is cheap and every clone shares the same state.
///
/// # Example
///
/// ```rust,no_run
/// use spacewx_feeds::noaa::NoaaClient;
/// use spacewx_live::LiveMonitor;
/// use std::time::Duration;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let monitor = LiveMonitor::builder()
///         .source(NoaaClient::builder().build()?)
///         .interval(Duration::from_secs(60))
///         .build()?;
///
///     let mut rx = monitor.subscribe();
///     let _handle = monitor.start();
///
///     while rx.changed().await.is_ok() {
///         let state = rx.borrow_and_update().clone();
///         println!("severity {:.2}", state.severity);
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct LiveMonitor {
    shared: Arc<Shared>,
    source: Arc<dyn FeedSource>,
    outputs: Arc<Vec<Output>>,
    /// Generation of the last snapshot written to the outputs.
    emitted: Arc<Mutex<u64>>,
    interval: Duration,
    policy: FeedPolicy,
}

impl LiveMonitor {
    /// Create a monitor with the default interval and policy.
    pub fn new(source: impl FeedSource + 'static) -> Self {
        Self::with_source(Arc::new(source), Vec::new(), DEFAULT_INTERVAL, FeedPolicy::default())
    }

    /// Create a builder for configuring the monitor.
    pub fn builder() -> LiveMonitorBuilder {
        LiveMonitorBuilder::new()
    }

    fn with_source(
        source: Arc<dyn FeedSource>,
        outputs: Vec<Output>,
        interval: Duration,
        policy: FeedPolicy,
    ) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            source,
            outputs: Arc::new(outputs),
            emitted: Arc::new(Mutex::new(0)),
            interval: interval.max(MIN_INTERVAL),
            policy,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn policy(&self) -> FeedPolicy {
        self.policy
    }

    /// Description of the feed source, for logs and status lines.
    pub fn source_description(&self) -> &str {
        self.source.description()
    }

    /// Watch the published state. The receiver starts at the current value.
    pub fn subscribe(&self) -> watch::Receiver<LiveState> {
        self.shared.subscribe()
    }

    /// The current state.
    pub fn snapshot(&self) -> LiveState {
        self.shared.snapshot()
    }

    /// Severities of recent successful refreshes.
    pub fn trend(&self) -> SeverityTrend {
        self.shared.trend()
    }

    /// Whether the monitor still accepts updates.
    pub fn is_active(&self) -> bool {
        self.shared.is_active()
    }

    /// Run one tick now.
    ///
    /// Concurrent calls are allowed. Whichever tick started last wins; an
    /// older tick that finishes afterwards is reported as
    /// [`RefreshOutcome::Superseded`] and changes nothing.
    pub async fn refresh(&self) -> RefreshOutcome {
        let Some(in_flight) = self.shared.begin() else {
            return RefreshOutcome::Inactive;
        };
        let generation = in_flight.generation();
        debug!(generation, source = self.source.description(), "refreshing feeds");

        let tick = self.fetch().await;
        let (outcome, state) = in_flight.settle(tick);

        match &outcome {
            RefreshOutcome::Updated => debug!(generation, "live state updated"),
            RefreshOutcome::Failed(message) => warn!(generation, error = %message, "refresh failed"),
            RefreshOutcome::Superseded => debug!(generation, "discarding superseded refresh"),
            RefreshOutcome::Inactive => debug!(generation, "monitor stopped during refresh"),
        }

        if let Some(state) = state {
            self.emit(generation, &state).await;
        }
        outcome
    }

    async fn fetch(&self) -> Tick {
        match self.policy {
            FeedPolicy::Joined => {
                match tokio::try_join!(self.source.fetch_kp(), self.source.fetch_plasma()) {
                    Ok((kp, plasma)) => Tick {
                        kp: Some(kp),
                        plasma: Some(plasma),
                        errors: Vec::new(),
                    },
                    Err(e) => Tick::failed(e.to_string()),
                }
            }
            FeedPolicy::Independent => {
                let (kp, plasma) = tokio::join!(self.source.fetch_kp(), self.source.fetch_plasma());
                let mut tick = Tick::default();
                match kp {
                    Ok(kp) => tick.kp = Some(kp),
                    Err(e) => tick.errors.push(format!("kp feed: {e}")),
                }
                match plasma {
                    Ok(plasma) => tick.plasma = Some(plasma),
                    Err(e) => tick.errors.push(format!("plasma feed: {e}")),
                }
                tick
            }
        }
    }

    /// Write a settled snapshot to every output, in generation order.
    ///
    /// Writes are serialized, and a snapshot older than one already written
    /// is skipped, so overlapping ticks never leave stale data behind.
    async fn emit(&self, generation: u64, state: &LiveState) {
        if self.outputs.is_empty() {
            return;
        }
        let mut emitted = self.emitted.lock().await;
        if generation <= *emitted {
            debug!(generation, newer = *emitted, "skipping stale output write");
            return;
        }
        *emitted = generation;

        for output in self.outputs.iter() {
            if let Err(e) = output.emit(state).await {
                warn!(error = %e, ?output, "failed to write snapshot");
            }
        }
    }

    /// Start refreshing in the background: once immediately, then every
    /// interval.
    ///
    /// Ticks may overlap if a fetch takes longer than the interval. Dropping
    /// or stopping the returned handle, or calling
    /// [`shutdown`](Self::shutdown) on any clone, cancels the timer, aborts
    /// in-flight ticks and deactivates the monitor.
    pub fn start(&self) -> MonitorHandle {
        let mut stop_rx = self.shared.stopped();
        let monitor = self.clone();

        info!(
            interval = ?self.interval,
            policy = %self.policy,
            source = self.source.description(),
            "starting live monitor"
        );

        let task = tokio::spawn(async move {
            if *stop_rx.borrow_and_update() {
                debug!("monitor already shut down, timer not started");
                return;
            }
            let mut timer = tokio::time::interval(monitor.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut ticks = JoinSet::new();

            loop {
                tokio::select! {
                    _ = timer.tick() => {
                        let monitor = monitor.clone();
                        ticks.spawn(async move { monitor.refresh().await });
                    }
                    Some(_) = ticks.join_next() => {}
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            ticks.abort_all();
            info!("live monitor stopped");
        });

        MonitorHandle {
            shared: Arc::clone(&self.shared),
            task: Some(task),
        }
    }

    /// Deactivate the monitor and stop any timer started by
    /// [`start`](Self::start). Ticks still in flight finish as no-ops and
    /// later calls to [`refresh`](Self::refresh) return
    /// [`RefreshOutcome::Inactive`].
    pub fn shutdown(&self) {
        self.shared.deactivate();
    }
}

/// Builder for configuring a [`LiveMonitor`].
#[derive(Debug, Default)]
pub struct LiveMonitorBuilder {
    source: Option<Arc<dyn FeedSource>>,
    outputs: Vec<Output>,
    interval: Option<Duration>,
    policy: FeedPolicy,
}

impl LiveMonitorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the feed source. Required.
    pub fn source(mut self, source: impl FeedSource + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Set the refresh interval.
    ///
    /// Defaults to 60 seconds if not specified.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn policy(mut self, policy: FeedPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Add an output destination.
    ///
    /// Multiple outputs can be added; snapshots are written to all of them.
    pub fn output(mut self, output: Output) -> Self {
        self.outputs.push(output);
        self
    }

    /// Build the monitor.
    pub fn build(self) -> Result<LiveMonitor, MonitorError> {
        let source = self.source.ok_or(MonitorError::MissingSource)?;
        Ok(LiveMonitor::with_source(
            source,
            self.outputs,
            self.interval.unwrap_or(DEFAULT_INTERVAL),
            self.policy,
        ))
    }
}

/// Handle for a running monitor.
///
/// Drop this handle to stop the monitor, or call `stop()` explicitly.
#[derive(Debug)]
pub struct MonitorHandle {
    shared: Arc<Shared>,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Stop the timer and deactivate the monitor.
    pub fn stop(self) {
        drop(self);
    }

    /// Stop and wait for the background task to exit.
    pub async fn shutdown(mut self) {
        self.signal_stop();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    fn signal_stop(&self) {
        self.shared.deactivate();
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.signal_stop();
        }
    }
}

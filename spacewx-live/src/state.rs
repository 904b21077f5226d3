//! Internal state management for the published snapshot.
//!
//! There is exactly one writer path: a tick begins, fetches, then settles.
//! Every write happens under the gate mutex and replaces the whole
//! [`LiveState`] on the watch channel, so readers never observe a partially
//! updated snapshot.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use parking_lot::{Mutex, RwLock};
use spacewx_feeds::{KpFeed, PlasmaFeed};
use spacewx_types::{LiveState, SeverityMemo, WindPoint};
use tokio::sync::watch;

use crate::trend::SeverityTrend;

/// Message used when a failure carries no text of its own.
pub const FALLBACK_ERROR: &str = "Failed to fetch live space weather data";

/// What one tick brought back from the feeds.
#[derive(Debug, Default)]
pub(crate) struct Tick {
    pub kp: Option<KpFeed>,
    pub plasma: Option<PlasmaFeed>,
    pub errors: Vec<String>,
}

impl Tick {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
            ..Default::default()
        }
    }

    fn has_data(&self) -> bool {
        self.kp.is_some() || self.plasma.is_some()
    }

    fn error_message(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        let joined = self
            .errors
            .iter()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .collect::<Vec<_>>()
            .join("; ");
        if joined.is_empty() {
            Some(FALLBACK_ERROR.to_string())
        } else {
            Some(joined)
        }
    }
}

/// How a settled tick affected the published state.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// Fresh data was published and the error was cleared.
    Updated,

    /// The tick failed (fully, or for one feed under the independent
    /// policy); the message was published in `error`.
    Failed(String),

    /// A newer tick had already been applied, so this result was dropped.
    Superseded,

    /// The monitor was shut down; nothing was written.
    Inactive,
}

impl RefreshOutcome {
    /// Whether this tick wrote new data or an error to the snapshot.
    pub fn is_applied(&self) -> bool {
        matches!(self, RefreshOutcome::Updated | RefreshOutcome::Failed(_))
    }
}

#[derive(Debug, Default)]
struct Gate {
    /// Generation of the newest tick whose result was applied.
    applied: u64,
    in_flight: usize,
    memo: SeverityMemo,
}

/// State shared by the monitor, its timer task and its handles.
#[derive(Debug)]
pub(crate) struct Shared {
    tx: watch::Sender<LiveState>,
    gate: Mutex<Gate>,
    next_generation: AtomicU64,
    active: AtomicBool,
    stop: watch::Sender<bool>,
    trend: RwLock<SeverityTrend>,
}

impl Default for Shared {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(LiveState::initial());
        let (stop, _) = watch::channel(false);
        Self {
            tx,
            gate: Mutex::new(Gate::default()),
            next_generation: AtomicU64::new(0),
            active: AtomicBool::new(true),
            stop,
            trend: RwLock::new(SeverityTrend::new()),
        }
    }
}

impl Shared {
    pub fn subscribe(&self) -> watch::Receiver<LiveState> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> LiveState {
        self.tx.borrow().clone()
    }

    pub fn trend(&self) -> SeverityTrend {
        self.trend.read().clone()
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Stop accepting writes and signal every timer task to exit.
    /// Completions that arrive later are discarded.
    pub fn deactivate(&self) {
        {
            // Taking the gate orders this against any settle in progress
            let _gate = self.gate.lock();
            self.active.store(false, Ordering::Release);
        }
        self.stop.send_replace(true);
    }

    /// Flips to true once the monitor is deactivated.
    pub fn stopped(&self) -> watch::Receiver<bool> {
        self.stop.subscribe()
    }

    /// Start a tick: assign it a generation and raise `loading`.
    ///
    /// Returns None once the monitor has been shut down.
    pub fn begin(self: &Arc<Self>) -> Option<InFlight> {
        let mut gate = self.gate.lock();
        if !self.is_active() {
            return None;
        }

        gate.in_flight += 1;
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        self.publish_loading(true);

        Some(InFlight {
            shared: Arc::clone(self),
            generation,
            settled: false,
        })
    }

    fn publish_loading(&self, loading: bool) {
        self.tx.send_if_modified(|state| {
            if state.loading == loading {
                false
            } else {
                state.loading = loading;
                true
            }
        });
    }
}

/// A tick that has started but not yet settled.
///
/// Dropping it without settling (for example when the timer task is
/// cancelled mid-fetch) still releases its hold on `loading`.
#[derive(Debug)]
pub(crate) struct InFlight {
    shared: Arc<Shared>,
    generation: u64,
    settled: bool,
}

impl InFlight {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Apply the tick's result, unless a newer tick got there first or the
    /// monitor was shut down in the meantime.
    pub fn settle(mut self, tick: Tick) -> (RefreshOutcome, Option<LiveState>) {
        self.settled = true;
        let shared = Arc::clone(&self.shared);
        let mut gate = shared.gate.lock();
        gate.in_flight = gate.in_flight.saturating_sub(1);

        if !shared.is_active() {
            return (RefreshOutcome::Inactive, None);
        }

        let still_loading = gate.in_flight > 0;
        if self.generation <= gate.applied {
            shared.publish_loading(still_loading);
            return (RefreshOutcome::Superseded, None);
        }
        gate.applied = self.generation;

        let error = tick.error_message();
        let has_data = tick.has_data();

        let mut next = shared.tx.borrow().clone();
        if let Some(kp) = tick.kp {
            next.kp_now = kp.latest_kp;
            next.kp_time = Some(kp.latest_time);
            next.kp_history = kp.history;
        }
        if let Some(plasma) = tick.plasma {
            next.solar_wind_speed = plasma.latest.speed;
            next.solar_wind_density = plasma.latest.density;
            next.wind_history = plasma.history.into_iter().map(WindPoint::from).collect();
        }
        if has_data {
            next.last_updated = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true));
            next.revision = self.generation;
        }
        next.loading = still_loading;
        next.error = error.clone();
        next.severity = gate.memo.get(next.kp_now, next.solar_wind_speed);

        if has_data {
            shared.trend.write().record(next.severity);
        }
        shared.tx.send_replace(next.clone());

        let outcome = match error {
            Some(message) => RefreshOutcome::Failed(message),
            None => RefreshOutcome::Updated,
        };
        (outcome, Some(next))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut gate = self.shared.gate.lock();
        gate.in_flight = gate.in_flight.saturating_sub(1);
        if self.shared.is_active() && gate.in_flight == 0 {
            self.shared.publish_loading(false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use spacewx_feeds::{parse_kp_table, parse_plasma_table};

    fn kp(value: &str) -> KpFeed {
        parse_kp_table(&json!([["time", "kp"], ["t-kp", value]])).unwrap()
    }

    fn plasma(speed: &str) -> PlasmaFeed {
        parse_plasma_table(&json!([["time", "d", "s", "t"], ["t-p", "5", speed, "1"]])).unwrap()
    }

    #[test]
    fn begin_raises_loading_and_settle_clears_it() {
        let shared = Arc::new(Shared::default());
        let rx = shared.subscribe();

        let tick = shared.begin().unwrap();
        assert!(rx.borrow().loading);

        let (outcome, state) = tick.settle(Tick {
            kp: Some(kp("2")),
            plasma: Some(plasma("420")),
            errors: vec![],
        });
        assert_eq!(outcome, RefreshOutcome::Updated);
        let state = state.unwrap();
        assert!(!state.loading);
        assert_eq!(state.kp_now, Some(2.0));
        assert_eq!(state.kp_time.as_deref(), Some("t-kp"));
        assert_eq!(*rx.borrow(), state);
    }

    #[test]
    fn generations_increase() {
        let shared = Arc::new(Shared::default());
        let a = shared.begin().unwrap();
        let b = shared.begin().unwrap();
        assert!(b.generation() > a.generation());
    }

    #[test]
    fn older_generation_is_superseded() {
        let shared = Arc::new(Shared::default());
        let older = shared.begin().unwrap();
        let newer = shared.begin().unwrap();

        let (outcome, _) = newer.settle(Tick {
            kp: Some(kp("5")),
            ..Default::default()
        });
        assert_eq!(outcome, RefreshOutcome::Updated);
        // Older tick still in flight
        assert!(shared.snapshot().loading);

        let (outcome, state) = older.settle(Tick {
            kp: Some(kp("1")),
            ..Default::default()
        });
        assert_eq!(outcome, RefreshOutcome::Superseded);
        assert!(state.is_none());

        let snapshot = shared.snapshot();
        assert_eq!(snapshot.kp_now, Some(5.0));
        assert!(!snapshot.loading);
    }

    #[test]
    fn dropped_tick_releases_loading() {
        let shared = Arc::new(Shared::default());
        let tick = shared.begin().unwrap();
        assert!(shared.snapshot().loading);
        drop(tick);
        assert!(!shared.snapshot().loading);
    }

    #[test]
    fn nothing_is_written_after_deactivate() {
        let shared = Arc::new(Shared::default());
        let tick = shared.begin().unwrap();
        let before = shared.snapshot();

        shared.deactivate();
        let (outcome, state) = tick.settle(Tick {
            kp: Some(kp("8")),
            ..Default::default()
        });

        assert_eq!(outcome, RefreshOutcome::Inactive);
        assert!(state.is_none());
        assert_eq!(shared.snapshot(), before);
        assert!(shared.begin().is_none());
    }

    #[test]
    fn deactivate_signals_stop() {
        let shared = Arc::new(Shared::default());
        let stopped = shared.stopped();
        assert!(!*stopped.borrow());

        shared.deactivate();
        assert!(*stopped.borrow());
        // Late subscribers see it too
        assert!(*shared.stopped().borrow());
    }

    #[test]
    fn revision_moves_only_with_new_readings() {
        let shared = Arc::new(Shared::default());
        assert_eq!(shared.snapshot().revision, 0);

        shared.begin().unwrap().settle(Tick {
            kp: Some(kp("3")),
            ..Default::default()
        });
        let first = shared.snapshot().revision;
        assert!(first > 0);

        shared.begin().unwrap().settle(Tick::failed("boom"));
        assert_eq!(shared.snapshot().revision, first);

        // Same readings, same millisecond: still a new revision
        shared.begin().unwrap().settle(Tick {
            kp: Some(kp("3")),
            ..Default::default()
        });
        assert!(shared.snapshot().revision > first);
    }

    #[test]
    fn empty_error_text_uses_fallback() {
        let tick = Tick::failed("   ");
        assert_eq!(tick.error_message().as_deref(), Some(FALLBACK_ERROR));
    }

    #[test]
    fn failed_tick_keeps_last_updated_and_trend() {
        let shared = Arc::new(Shared::default());
        shared.begin().unwrap().settle(Tick {
            kp: Some(kp("3")),
            plasma: Some(plasma("500")),
            errors: vec![],
        });
        let good = shared.snapshot();

        let (outcome, _) = shared.begin().unwrap().settle(Tick::failed("boom"));
        assert_eq!(outcome, RefreshOutcome::Failed("boom".into()));

        let after = shared.snapshot();
        assert_eq!(after.last_updated, good.last_updated);
        assert_eq!(after.severity, good.severity);
        assert_eq!(after.error.as_deref(), Some("boom"));
        assert_eq!(shared.trend().len(), 1);
    }
}

//! Topic-based publish/subscribe for live state changes.
//!
//! An [`EventBus`] is an ordinary value: create one where consumers are
//! composed and hand out clones. [`EventBus::connect`] attaches it to a
//! monitor's state channel; from then on a single background task turns
//! published snapshots into events.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use spacewx_types::{LiveState, SeverityLevel};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Kinds of event a handler can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    /// A refresh applied new readings.
    LiveUpdate,
    /// The qualitative severity level changed.
    SeverityChange,
    /// A refresh failed with a new error message.
    FeedError,
}

/// An event delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    LiveUpdate(LiveState),
    SeverityChange {
        from: SeverityLevel,
        to: SeverityLevel,
        severity: f64,
    },
    FeedError(String),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::LiveUpdate(_) => Topic::LiveUpdate,
            Event::SeverityChange { .. } => Topic::SeverityChange,
            Event::FeedError(_) => Topic::FeedError,
        }
    }
}

/// Identifies one subscription, for [`EventBus::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    handlers: RwLock<HashMap<Topic, Vec<(SubscriptionId, Handler)>>>,
    next_id: AtomicU64,
    task: Mutex<Option<JoinHandle<()>>>,
}

/// Routes events to the handlers subscribed to their topic.
///
/// # Example
///
/// ```rust
/// use spacewx_live::{Event, EventBus, Topic};
///
/// let bus = EventBus::new();
/// let id = bus.subscribe(Topic::FeedError, |event| {
///     if let Event::FeedError(message) = event {
///         eprintln!("feed error: {message}");
///     }
/// });
///
/// assert_eq!(bus.emit(&Event::FeedError("timeout".into())), 1);
/// assert!(bus.unsubscribe(Topic::FeedError, id));
/// ```
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one topic.
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .handlers
            .write()
            .entry(topic)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove a handler. Returns `false` if it was not subscribed to `topic`.
    pub fn unsubscribe(&self, topic: Topic, id: SubscriptionId) -> bool {
        let mut handlers = self.inner.handlers.write();
        let Some(list) = handlers.get_mut(&topic) else {
            return false;
        };
        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(&topic);
        }
        removed
    }

    /// Number of handlers subscribed to `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.inner
            .handlers
            .read()
            .get(&topic)
            .map_or(0, Vec::len)
    }

    /// Deliver an event to every handler of its topic. Returns how many
    /// handlers ran.
    pub fn emit(&self, event: &Event) -> usize {
        // Handlers run outside the lock so they may subscribe or unsubscribe
        let handlers: Vec<Handler> = self
            .inner
            .handlers
            .read()
            .get(&event.topic())
            .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Start turning published states into events.
    ///
    /// Replaces any previous connection. Must be called within a tokio
    /// runtime.
    pub fn connect(&self, mut rx: watch::Receiver<LiveState>) {
        let bus = self.clone();
        let mut seen = Seen::from(&*rx.borrow_and_update());
        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();
                for event in seen.diff(state) {
                    bus.emit(&event);
                }
            }
            debug!("state channel closed, event bus idle");
        });

        if let Some(previous) = self.inner.task.lock().replace(task) {
            previous.abort();
        }
    }

    /// Stop the connection task, if any. Subscriptions are kept.
    pub fn disconnect(&self) {
        if let Some(task) = self.inner.task.lock().take() {
            task.abort();
        }
    }

    pub fn is_connected(&self) -> bool {
        self.inner
            .task
            .lock()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.inner.handlers.read();
        f.debug_struct("EventBus")
            .field("topics", &handlers.keys().collect::<Vec<_>>())
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// What the connection task has already reported.
struct Seen {
    revision: u64,
    level: SeverityLevel,
    error: Option<String>,
}

impl From<&LiveState> for Seen {
    fn from(state: &LiveState) -> Self {
        Self {
            revision: state.revision,
            level: state.level(),
            error: state.error.clone(),
        }
    }
}

impl Seen {
    fn diff(&mut self, state: LiveState) -> Vec<Event> {
        let mut events = Vec::new();

        if state.error.is_some() && state.error != self.error {
            events.extend(state.error.clone().map(Event::FeedError));
        }
        self.error = state.error.clone();

        let level = state.level();
        if level != self.level {
            events.push(Event::SeverityChange {
                from: self.level,
                to: level,
                severity: state.severity,
            });
            self.level = level;
        }

        if state.has_data() && state.revision != self.revision {
            self.revision = state.revision;
            events.push(Event::LiveUpdate(state));
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn collect(bus: &EventBus, topic: Topic) -> Arc<Mutex<Vec<Event>>> {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        bus.subscribe(topic, move |e| sink.lock().push(e.clone()));
        events
    }

    async fn wait_for(events: &Arc<Mutex<Vec<Event>>>, n: usize) {
        tokio::time::timeout(Duration::from_secs(1), async {
            while events.lock().len() < n {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("timed out waiting for events");
    }

    fn applied(kp: f64, speed: f64, stamp: &str, revision: u64) -> LiveState {
        let mut state = LiveState::initial();
        state.revision = revision;
        state.kp_now = Some(kp);
        state.solar_wind_speed = Some(speed);
        state.last_updated = Some(stamp.to_string());
        state.loading = false;
        state.recompute_severity();
        state
    }

    #[test]
    fn emit_reaches_only_matching_topic() {
        let bus = EventBus::new();
        let errors = collect(&bus, Topic::FeedError);
        let updates = collect(&bus, Topic::LiveUpdate);

        assert_eq!(bus.emit(&Event::FeedError("down".into())), 1);

        assert_eq!(errors.lock().len(), 1);
        assert!(updates.lock().is_empty());
    }

    #[test]
    fn emit_without_subscribers_is_a_no_op() {
        let bus = EventBus::new();
        assert_eq!(bus.emit(&Event::FeedError("x".into())), 0);
    }

    #[test]
    fn unsubscribe_removes_only_that_handler() {
        let bus = EventBus::new();
        let a = bus.subscribe(Topic::LiveUpdate, |_| {});
        let _b = bus.subscribe(Topic::LiveUpdate, |_| {});
        assert_eq!(bus.subscriber_count(Topic::LiveUpdate), 2);

        assert!(bus.unsubscribe(Topic::LiveUpdate, a));
        assert!(!bus.unsubscribe(Topic::LiveUpdate, a));
        assert!(!bus.unsubscribe(Topic::FeedError, a));
        assert_eq!(bus.subscriber_count(Topic::LiveUpdate), 1);
    }

    #[test]
    fn handler_may_subscribe_during_emit() {
        let bus = EventBus::new();
        let inner = bus.clone();
        bus.subscribe(Topic::FeedError, move |_| {
            inner.subscribe(Topic::LiveUpdate, |_| {});
        });

        bus.emit(&Event::FeedError("x".into()));
        assert_eq!(bus.subscriber_count(Topic::LiveUpdate), 1);
    }

    #[test]
    fn seen_reports_level_changes_and_new_errors() {
        let mut seen = Seen::from(&LiveState::initial());

        let severe = applied(9.0, 1000.0, "t1", 1);
        let events = seen.diff(severe.clone());
        assert_eq!(
            events,
            vec![
                Event::SeverityChange {
                    from: SeverityLevel::Quiet,
                    to: SeverityLevel::Severe,
                    severity: 1.0,
                },
                Event::LiveUpdate(severe.clone()),
            ]
        );

        // Loading flips alone produce nothing
        let mut loading = severe.clone();
        loading.loading = true;
        assert!(seen.diff(loading).is_empty());

        let mut failed = severe.clone();
        failed.error = Some("timeout".into());
        assert_eq!(seen.diff(failed.clone()), vec![Event::FeedError("timeout".into())]);
        // Same error again is not repeated
        assert!(seen.diff(failed).is_empty());
    }

    #[test]
    fn seen_reports_each_revision_even_within_one_timestamp() {
        let mut seen = Seen::from(&LiveState::initial());

        let first = applied(2.0, 400.0, "2024-01-01T00:00:00.000Z", 1);
        let second = applied(2.0, 400.0, "2024-01-01T00:00:00.000Z", 2);

        assert_eq!(seen.diff(first.clone()), vec![Event::LiveUpdate(first.clone())]);
        assert_eq!(seen.diff(second.clone()), vec![Event::LiveUpdate(second)]);
        // Republishing the same revision (e.g. a loading flip) is not an update
        let mut loading = first;
        loading.revision = 2;
        loading.loading = true;
        assert!(seen.diff(loading).is_empty());
    }

    #[tokio::test]
    async fn connect_turns_state_changes_into_events() {
        let (tx, rx) = watch::channel(LiveState::initial());
        let bus = EventBus::new();
        let updates = collect(&bus, Topic::LiveUpdate);
        let changes = collect(&bus, Topic::SeverityChange);
        let errors = collect(&bus, Topic::FeedError);

        bus.connect(rx);
        assert!(bus.is_connected());

        tx.send_replace(applied(2.0, 420.0, "t1", 1));
        wait_for(&updates, 1).await;
        assert!(changes.lock().is_empty());

        tx.send_replace(applied(9.0, 900.0, "t2", 2));
        wait_for(&updates, 2).await;
        wait_for(&changes, 1).await;
        assert!(matches!(
            changes.lock()[0],
            Event::SeverityChange {
                to: SeverityLevel::Severe,
                ..
            }
        ));

        let mut failed = applied(9.0, 900.0, "t2", 2);
        failed.error = Some("boom".into());
        tx.send_replace(failed);
        wait_for(&errors, 1).await;
        assert_eq!(updates.lock().len(), 2);
    }

    #[tokio::test]
    async fn disconnect_stops_delivery() {
        let (tx, rx) = watch::channel(LiveState::initial());
        let bus = EventBus::new();
        let updates = collect(&bus, Topic::LiveUpdate);

        bus.connect(rx);
        bus.disconnect();
        assert!(!bus.is_connected());

        tx.send_replace(applied(1.0, 300.0, "t1", 1));
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(updates.lock().is_empty());
    }

    #[tokio::test]
    async fn reconnect_replaces_previous_connection() {
        let (tx_a, rx_a) = watch::channel(LiveState::initial());
        let (tx_b, rx_b) = watch::channel(LiveState::initial());
        let bus = EventBus::new();
        let updates = collect(&bus, Topic::LiveUpdate);

        bus.connect(rx_a);
        bus.connect(rx_b);

        tx_a.send_replace(applied(1.0, 300.0, "a", 1));
        tx_b.send_replace(applied(1.0, 300.0, "b", 1));
        wait_for(&updates, 1).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        let updates = updates.lock();
        assert_eq!(updates.len(), 1);
        assert!(matches!(&updates[0], Event::LiveUpdate(s) if s.last_updated.as_deref() == Some("b")));
    }
}

//! # spacewx-live
//!
//! Keeps a live space weather snapshot current by polling the Kp and solar
//! wind feeds on a fixed interval.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spacewx_feeds::noaa::NoaaClient;
//! use spacewx_live::{LiveMonitor, Output};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let monitor = LiveMonitor::builder()
//!         .source(NoaaClient::builder().build()?)
//!         .interval(Duration::from_secs(60))
//!         .output(Output::file("live.json"))
//!         .build()?;
//!
//!     // Refresh now, then every minute until the handle is dropped
//!     let handle = monitor.start();
//!
//!     tokio::time::sleep(Duration::from_secs(300)).await;
//!     println!("severity: {:.2}", monitor.snapshot().severity);
//!
//!     handle.stop();
//!     Ok(())
//! }
//! ```
//!
//! ## Guarantees
//!
//! - **Whole snapshots**: every update replaces the complete [`LiveState`]
//! - **Stale on error**: a failed tick sets `error` and keeps the last good readings
//! - **Newest wins**: a slow tick never overwrites the result of a later one
//! - **Quiet after stop**: nothing is written once the monitor is stopped

mod events;
mod monitor;
mod output;
mod state;
mod trend;

pub use events::{Event, EventBus, SubscriptionId, Topic};
pub use monitor::{
    FeedPolicy, LiveMonitor, LiveMonitorBuilder, MonitorError, MonitorHandle, DEFAULT_INTERVAL,
};
pub use output::Output;
pub use state::{RefreshOutcome, FALLBACK_ERROR};
pub use trend::SeverityTrend;

// Re-export types for convenience
pub use spacewx_types::{LiveState, SeverityLevel};

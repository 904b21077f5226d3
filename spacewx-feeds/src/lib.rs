//! # spacewx-feeds
//!
//! Fetchers and parsers for the two NOAA Space Weather Prediction Center
//! feeds the live monitor consumes.
//!
//! ## Supported Feeds
//!
//! - **Planetary Kp index**: `[timestamp, kp, a_index, status]` rows
//! - **Solar wind plasma**: `[timestamp, density, speed, temperature]` rows
//!
//! Both arrive as a JSON array whose first row is a header. The parsers in
//! [`table`] drop the header, keep the final row as "latest" and retain a
//! bounded trailing window of rows.
//!
//! ## Sources
//!
//! - [`noaa::NoaaClient`] (`noaa` feature, default) - live HTTP fetches
//! - [`FileFeeds`] - saved tables on disk, for offline runs
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spacewx_feeds::noaa::NoaaClient;
//! use spacewx_feeds::FeedSource;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = NoaaClient::builder().build()?;
//!     let kp = client.fetch_kp().await?;
//!
//!     println!("Kp history has {} points", kp.history.len());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod table;

mod source;

#[cfg(feature = "noaa")]
pub mod noaa;

pub use error::FeedError;
pub use source::{FeedSource, FileFeeds};
pub use table::{parse_kp_table, parse_plasma_table, KpFeed, PlasmaFeed};

// Re-export types for convenience
pub use spacewx_types::{KpPoint, PlasmaPoint};

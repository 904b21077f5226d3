//! # spacewx
//!
//! Command line monitor for live space weather. It polls the NOAA SWPC
//! planetary Kp and solar wind plasma feeds, derives an impact severity and
//! prints a readout on every update.
//!
//! The heavy lifting lives in the workspace crates:
//!
//! - [`spacewx_types`]: readings, the published `LiveState` and the severity formula
//! - [`spacewx_feeds`]: feed fetchers and table parsers
//! - [`spacewx_live`]: the refresh loop, event bus and outputs
//!
//! This crate adds what the binary needs on top:
//!
//! - **[`config`]**: layered settings (TOML file, `SPACEWX_*` environment)
//! - **[`duration`]**: duration strings such as `"60s"` or `"1.5m"`
//! - **[`report`]**: one-line readouts and JSON export
//!
//! ## Usage
//!
//! ```bash
//! # Refresh every minute until Ctrl-C
//! spacewx
//!
//! # One refresh, non-zero exit on failure
//! spacewx --once
//!
//! # Offline, from saved tables
//! spacewx --once --kp-file kp.json --plasma-file plasma.json
//! ```

pub mod config;
pub mod duration;
pub mod report;

pub use config::Settings;

//! # spacewx-types
//!
//! Core types for live space weather monitoring. This crate defines the
//! readings parsed from the NOAA SWPC feeds, the [`LiveState`] snapshot that
//! is published to consumers, and the derived impact [`severity`].
//!
//! ## Design Goals
//!
//! - **Zero required dependencies**: Core types work without any serialization framework
//! - **Optional serialization**: Enable the `serde` feature to get the published JSON shape
//! - **Pure derivation**: Severity is a pure function of the latest Kp and wind speed
//!
//! ## Features
//!
//! - `std` (default): Standard library support
//! - `serde`: JSON serialization via serde, using the camelCase keys consumers expect
//!
//! ## Example
//!
//! ```rust
//! use spacewx_types::{severity, SeverityLevel};
//!
//! let value = severity(Some(9.0), Some(1000.0));
//! assert_eq!(value, 1.0);
//! assert_eq!(SeverityLevel::from_severity(value), SeverityLevel::Severe);
//!
//! // Missing wind data contributes nothing to the weighted sum
//! let quiet = severity(Some(0.0), None);
//! assert_eq!(quiet, 0.0);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod point;
mod severity;
mod state;

pub use point::*;
pub use severity::*;
pub use state::*;

/// Number of trailing Kp rows kept in [`LiveState::kp_history`].
pub const KP_HISTORY_LEN: usize = 24;

/// Number of trailing plasma rows kept in [`LiveState::wind_history`].
pub const WIND_HISTORY_LEN: usize = 48;

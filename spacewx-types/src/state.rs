//! LiveState - the snapshot published to consumers.

use alloc::string::String;
use alloc::vec::Vec;

use crate::{severity, KpPoint, SeverityLevel, WindPoint};

/// A point-in-time view of live space weather conditions.
///
/// This is the only shape consumers ever see. It is replaced wholesale on
/// every refresh and never mutated in place, so a reader always holds a
/// consistent snapshot.
///
/// With the `serde` feature this serializes with camelCase keys
/// (`kpNow`, `solarWindSpeed`, `lastUpdated`, ...).
///
/// # Example
///
/// ```rust
/// use spacewx_types::{LiveState, SeverityLevel};
///
/// let state = LiveState::initial();
/// assert!(state.loading);
/// assert!(state.kp_now.is_none());
/// assert_eq!(state.level(), SeverityLevel::Quiet);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct LiveState {
    /// Latest Kp index.
    pub kp_now: Option<f64>,

    /// Timestamp of the latest Kp row.
    pub kp_time: Option<String>,

    /// Latest solar wind bulk speed (km/s).
    pub solar_wind_speed: Option<f64>,

    /// Latest solar wind proton density (p/cm³).
    pub solar_wind_density: Option<f64>,

    /// Most recent Kp readings, oldest first.
    pub kp_history: Vec<KpPoint>,

    /// Most recent wind speed readings, oldest first.
    pub wind_history: Vec<WindPoint>,

    /// ISO-8601 timestamp of the last successful refresh.
    pub last_updated: Option<String>,

    /// True while a refresh is in flight.
    pub loading: bool,

    /// Message from the most recent failed refresh.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub error: Option<String>,

    /// Derived impact severity in `[0, 1]`.
    pub severity: f64,

    /// Change key for the readings. Grows with every refresh that applies
    /// new data, even when `last_updated` does not change. Not published.
    #[cfg_attr(feature = "serde", serde(skip))]
    pub revision: u64,
}

impl LiveState {
    /// The state before the first refresh completes: no readings, loading.
    pub fn initial() -> Self {
        Self {
            kp_now: None,
            kp_time: None,
            solar_wind_speed: None,
            solar_wind_density: None,
            kp_history: Vec::new(),
            wind_history: Vec::new(),
            last_updated: None,
            loading: true,
            error: None,
            severity: 0.0,
            revision: 0,
        }
    }

    /// Qualitative label for the current severity.
    pub fn level(&self) -> SeverityLevel {
        SeverityLevel::from_severity(self.severity)
    }

    /// Whether any refresh has succeeded yet.
    pub fn has_data(&self) -> bool {
        self.last_updated.is_some()
    }

    /// Recompute severity from the current latest readings.
    pub fn recompute_severity(&mut self) {
        self.severity = severity(self.kp_now, self.solar_wind_speed);
    }
}

impl Default for LiveState {
    fn default() -> Self {
        Self::initial()
    }
}

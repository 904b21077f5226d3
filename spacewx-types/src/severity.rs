//! Derived impact severity.
//!
//! Severity folds the latest Kp index and solar wind speed into a single
//! value in `[0, 1]` for driving visual intensity indicators. It is not an
//! official space weather scale.

use core::fmt;

/// Upper bound of the Kp scale.
pub const KP_MAX: f64 = 9.0;

/// Wind speeds are clamped to this range (km/s) before normalization.
pub const WIND_SPEED_MIN: f64 = 200.0;
pub const WIND_SPEED_MAX: f64 = 1000.0;

const KP_WEIGHT: f64 = 0.7;
const SPEED_WEIGHT: f64 = 0.5;

/// Compute the impact severity from the latest Kp and wind speed.
///
/// ```text
/// kpNorm    = clamp(kp ?? 0, 0, 9) / 9
/// speedNorm = speed is None ? 0 : clamp(speed, 200, 1000) / 1000
/// severity  = min(1, kpNorm * 0.7 + speedNorm * 0.5)
/// ```
///
/// The two inputs treat absence differently: a missing Kp is read as 0,
/// while a missing speed drops its term entirely instead of contributing
/// the clamped floor of `200 / 1000`. Non-finite inputs count as missing.
pub fn severity(kp_now: Option<f64>, solar_wind_speed: Option<f64>) -> f64 {
    let kp = kp_now.filter(|v| v.is_finite()).unwrap_or(0.0);
    let kp_norm = kp.clamp(0.0, KP_MAX) / KP_MAX;

    let speed_norm = match solar_wind_speed.filter(|v| v.is_finite()) {
        Some(speed) => speed.clamp(WIND_SPEED_MIN, WIND_SPEED_MAX) / 1000.0,
        None => 0.0,
    };

    (kp_norm * KP_WEIGHT + speed_norm * SPEED_WEIGHT).min(1.0)
}

/// Qualitative label for a severity value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SeverityLevel {
    Quiet,
    Moderate,
    Severe,
}

impl SeverityLevel {
    /// Map a severity value to its label.
    ///
    /// `>= 0.75` is severe, `>= 0.45` moderate, anything else quiet.
    pub fn from_severity(severity: f64) -> Self {
        if severity >= 0.75 {
            SeverityLevel::Severe
        } else if severity >= 0.45 {
            SeverityLevel::Moderate
        } else {
            SeverityLevel::Quiet
        }
    }

    /// The label shown to consumers.
    pub fn label(&self) -> &'static str {
        match self {
            SeverityLevel::Quiet => "Quiet",
            SeverityLevel::Moderate => "Moderate",
            SeverityLevel::Severe => "Severe",
        }
    }
}

impl fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Caches the last computed severity, keyed on its two inputs.
///
/// [`SeverityMemo::get`] only recomputes when `(kp_now, solar_wind_speed)`
/// differs from the previous call.
#[derive(Debug, Clone, Default)]
pub struct SeverityMemo {
    last: Option<(Option<f64>, Option<f64>, f64)>,
    computations: u64,
}

impl SeverityMemo {
    /// Create an empty memo.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the severity for these inputs, recomputing only if they changed.
    pub fn get(&mut self, kp_now: Option<f64>, solar_wind_speed: Option<f64>) -> f64 {
        if let Some((kp, speed, value)) = self.last {
            if kp == kp_now && speed == solar_wind_speed {
                return value;
            }
        }

        let value = severity(kp_now, solar_wind_speed);
        self.last = Some((kp_now, solar_wind_speed, value));
        self.computations += 1;
        value
    }

    /// Number of times the formula actually ran.
    pub fn computations(&self) -> u64 {
        self.computations
    }
}

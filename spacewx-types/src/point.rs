//! Individual feed readings.

use alloc::string::String;

/// A planetary geomagnetic activity reading.
///
/// Produced from one row of the Kp feed. Points are immutable and the whole
/// history is replaced on every refresh.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KpPoint {
    /// Feed timestamp, kept verbatim.
    pub time: String,

    /// Estimated Kp index (0-9).
    pub kp: f64,
}

impl KpPoint {
    /// Create a new Kp point.
    pub fn new(time: impl Into<String>, kp: f64) -> Self {
        Self {
            time: time.into(),
            kp,
        }
    }
}

/// A solar wind plasma measurement.
///
/// Every numeric field is `None` when the upstream feed omitted it.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlasmaPoint {
    /// Feed timestamp, kept verbatim.
    pub time: String,

    /// Proton density in particles/cm³.
    pub density: Option<f64>,

    /// Bulk speed in km/s.
    pub speed: Option<f64>,

    /// Temperature in kelvin.
    pub temperature: Option<f64>,
}

impl PlasmaPoint {
    /// Create a plasma point with only a timestamp.
    pub fn new(time: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            ..Default::default()
        }
    }

    /// Set the density.
    pub fn density(mut self, density: f64) -> Self {
        self.density = Some(density);
        self
    }

    /// Set the bulk speed.
    pub fn speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    /// Set the temperature.
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// A wind speed sample, as kept in [`crate::LiveState::wind_history`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WindPoint {
    pub time: String,
    pub speed: Option<f64>,
}

impl From<&PlasmaPoint> for WindPoint {
    fn from(point: &PlasmaPoint) -> Self {
        Self {
            time: point.time.clone(),
            speed: point.speed,
        }
    }
}

impl From<PlasmaPoint> for WindPoint {
    fn from(point: PlasmaPoint) -> Self {
        Self {
            time: point.time,
            speed: point.speed,
        }
    }
}

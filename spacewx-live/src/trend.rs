//! Severity tracking across refreshes for sparklines and trend arrows.

use std::collections::VecDeque;

/// Maximum number of severity samples to keep.
const MAX_TREND_SIZE: usize = 60;

/// Severities of the most recent successful refreshes, oldest first.
#[derive(Debug, Clone, Default)]
pub struct SeverityTrend {
    samples: VecDeque<f64>,
}

impl SeverityTrend {
    /// Create an empty trend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the severity of a successful refresh.
    pub fn record(&mut self, severity: f64) {
        self.samples.push_back(severity);
        if self.samples.len() > MAX_TREND_SIZE {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Recorded severities, oldest first.
    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    /// The most recent severity.
    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    /// Change between the last two samples.
    ///
    /// Returns None if there's fewer than two samples.
    pub fn delta(&self) -> Option<f64> {
        let len = self.samples.len();
        if len < 2 {
            return None;
        }
        Some(self.samples[len - 1] - self.samples[len - 2])
    }

    /// Sparkline levels (0-7 for 8 bar heights), one per sample.
    pub fn sparkline(&self) -> Vec<u8> {
        self.samples
            .iter()
            .map(|&v| ((v.clamp(0.0, 1.0) * 7.0).round() as u8).min(7))
            .collect()
    }

    /// Render the sparkline with block characters.
    pub fn sparkline_string(&self) -> String {
        const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
        self.sparkline()
            .into_iter()
            .map(|level| BARS[level as usize])
            .collect()
    }
}

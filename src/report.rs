//! Plain-text and JSON renderings of the live state for the CLI.

use anyhow::Result;
use spacewx_live::SeverityTrend;
use spacewx_types::LiveState;

/// One-line readout of the current state.
///
/// Missing readings print as `--`. A stale snapshot keeps its readings and
/// gets the error appended.
pub fn readout(state: &LiveState, trend: Option<&SeverityTrend>) -> String {
    if !state.has_data() {
        return match &state.error {
            Some(error) => format!("no data yet | error: {}", error),
            None => "waiting for first update".to_string(),
        };
    }

    let mut line = format!(
        "Kp {} | wind {} km/s, {} p/cm³ | severity {:.2} {}",
        number(state.kp_now, 1),
        number(state.solar_wind_speed, 0),
        number(state.solar_wind_density, 1),
        state.severity,
        state.level(),
    );

    if let Some(trend) = trend.filter(|t| !t.is_empty()) {
        line.push(' ');
        line.push(arrow(trend.delta()));
        line.push(' ');
        line.push_str(&trend.sparkline_string());
    }

    if let Some(updated) = &state.last_updated {
        line.push_str(" | updated ");
        line.push_str(updated);
    }
    if let Some(error) = &state.error {
        line.push_str(" | stale: ");
        line.push_str(error);
    }
    line
}

/// Pretty JSON in the published camelCase shape.
pub fn to_json(state: &LiveState) -> Result<String> {
    Ok(serde_json::to_string_pretty(state)?)
}

fn number(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "--".to_string(),
    }
}

fn arrow(delta: Option<f64>) -> char {
    match delta {
        Some(d) if d > 0.005 => '↑',
        Some(d) if d < -0.005 => '↓',
        _ => '→',
    }
}

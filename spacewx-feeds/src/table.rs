//! Parsing of SWPC header-row tables.
//!
//! Both feeds are JSON arrays of arrays. Row 0 names the columns and every
//! following row holds positional values, oldest first:
//!
//! ```text
//! [["time_tag","Kp","a_running","station_count"],
//!  ["2024-01-01 00:00:00.000","2.33","9","8"],
//!  ...]
//! ```
//!
//! Cells may be JSON numbers, numeric strings, or `null`. Anything that does
//! not coerce to a finite number becomes `None`.

use serde_json::Value;

use spacewx_types::{KpPoint, PlasmaPoint, KP_HISTORY_LEN, WIND_HISTORY_LEN};

use crate::FeedError;

const KP_COLUMN: usize = 1;
const DENSITY_COLUMN: usize = 1;
const SPEED_COLUMN: usize = 2;
const TEMPERATURE_COLUMN: usize = 3;

/// The latest Kp row plus a bounded trailing window.
#[derive(Debug, Clone, PartialEq)]
pub struct KpFeed {
    /// Timestamp of the final data row.
    pub latest_time: String,

    /// Kp of the final data row, `None` if the cell was empty.
    pub latest_kp: Option<f64>,

    /// Up to [`KP_HISTORY_LEN`] trailing rows, oldest first. Rows whose Kp
    /// cell is empty are left out.
    pub history: Vec<KpPoint>,
}

impl KpFeed {
    /// Parse a Kp table from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, FeedError> {
        let value: Value = serde_json::from_slice(bytes)?;
        parse_kp_table(&value)
    }
}

/// The latest plasma row plus a bounded trailing window.
#[derive(Debug, Clone, PartialEq)]
pub struct PlasmaFeed {
    /// The final data row.
    pub latest: PlasmaPoint,

    /// Up to [`WIND_HISTORY_LEN`] trailing rows, oldest first.
    pub history: Vec<PlasmaPoint>,
}

impl PlasmaFeed {
    /// Parse a plasma table from raw JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, FeedError> {
        let value: Value = serde_json::from_slice(bytes)?;
        parse_plasma_table(&value)
    }
}

/// Parse the planetary Kp table: `[timestamp, kp, a_index, status]`.
pub fn parse_kp_table(value: &Value) -> Result<KpFeed, FeedError> {
    let rows = data_rows(value)?;
    let window = tail(rows, KP_HISTORY_LEN);

    let mut history = Vec::with_capacity(window.len());
    for row in window {
        let cells = row_cells(row)?;
        if let Some(kp) = number_at(cells, KP_COLUMN) {
            history.push(KpPoint::new(time_at(cells)?, kp));
        }
    }

    let latest = row_cells(last_row(rows)?)?;
    Ok(KpFeed {
        latest_time: time_at(latest)?,
        latest_kp: number_at(latest, KP_COLUMN),
        history,
    })
}

/// Parse the solar wind plasma table: `[timestamp, density, speed, temperature]`.
pub fn parse_plasma_table(value: &Value) -> Result<PlasmaFeed, FeedError> {
    let rows = data_rows(value)?;
    let history = tail(rows, WIND_HISTORY_LEN)
        .iter()
        .map(plasma_point)
        .collect::<Result<Vec<_>, _>>()?;

    let latest = plasma_point(last_row(rows)?)?;
    Ok(PlasmaFeed { latest, history })
}

fn plasma_point(row: &Value) -> Result<PlasmaPoint, FeedError> {
    let cells = row_cells(row)?;
    Ok(PlasmaPoint {
        time: time_at(cells)?,
        density: number_at(cells, DENSITY_COLUMN),
        speed: number_at(cells, SPEED_COLUMN),
        temperature: number_at(cells, TEMPERATURE_COLUMN),
    })
}

/// Strip the header row, requiring at least one data row after it.
fn data_rows(value: &Value) -> Result<&[Value], FeedError> {
    let rows = value
        .as_array()
        .ok_or_else(|| FeedError::Parse("expected an array of rows".to_string()))?;

    match rows.split_first() {
        Some((_header, data)) if !data.is_empty() => Ok(data),
        Some(_) => Err(FeedError::Parse("feed has a header but no data rows".to_string())),
        None => Err(FeedError::Parse("feed is empty".to_string())),
    }
}

fn last_row(rows: &[Value]) -> Result<&Value, FeedError> {
    rows.last()
        .ok_or_else(|| FeedError::Parse("feed has no data rows".to_string()))
}

/// The last `n` rows, keeping their original order.
fn tail<T>(rows: &[T], n: usize) -> &[T] {
    &rows[rows.len().saturating_sub(n)..]
}

fn row_cells(row: &Value) -> Result<&[Value], FeedError> {
    row.as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| FeedError::Parse(format!("expected a row array, got {}", row)))
}

fn time_at(cells: &[Value]) -> Result<String, FeedError> {
    match cells.first() {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        _ => Err(FeedError::Parse("row is missing its timestamp".to_string())),
    }
}

/// Coerce a cell to a finite number; anything else is `None`.
fn number_at(cells: &[Value], index: usize) -> Option<f64> {
    let number = match cells.get(index)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use super::types::Cell;

const DATETIME_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d.%m.%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: [&str; 5] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d.%m.%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
];

/// Parses the date shapes that show up in report headers. Dotted and slashed
/// dates are read day-first.
pub fn parse_date_string(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    for format in DATETIME_FORMATS.iter() {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS.iter() {
        if let Ok(d) = NaiveDate::parse_from_str(s, format) {
            return d.and_hms_opt(0, 0, 0);
        }
    }
    None
}

pub fn is_date_string(s: &str) -> bool {
    parse_date_string(s).is_some()
}

/// Converts an Excel serial date (1900 date system) into a timestamp.
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::try_milliseconds(millis)?)
}

/// Canonical key for a day column header: dates become `YYYY-MM-DD`,
/// everything else keeps its literal form.
pub fn normalize_column(header: &Cell) -> String {
    match header {
        Cell::Date(dt) => dt.format("%Y-%m-%d").to_string(),
        Cell::Text(s) => match parse_date_string(s) {
            Some(dt) => dt.format("%Y-%m-%d").to_string(),
            None => s.clone(),
        },
        other => other.to_string(),
    }
}

/// Canonical key → column index. Later columns win when two headers
/// normalize to the same key.
#[derive(Debug, Clone, Default)]
pub struct ColumnIndex {
    by_key: HashMap<String, usize>,
}

impl ColumnIndex {
    pub fn build(headers: &[Cell], columns: impl IntoIterator<Item = usize>) -> Self {
        let by_key = columns
            .into_iter()
            .filter_map(|idx| headers.get(idx).map(|h| (normalize_column(h), idx)))
            .collect();
        Self { by_key }
    }

    pub fn get(&self, key: &str) -> Option<usize> {
        self.by_key.get(key).copied()
    }

    pub fn resolve(&self, keys: &[String]) -> Vec<usize> {
        keys.iter().filter_map(|key| self.get(key)).collect()
    }
}

pub fn update_min_max(min_max: &mut (Option<String>, Option<String>), value: &str) {
    match &min_max.0 {
        Some(min_val) if value < min_val.as_str() => min_max.0 = Some(value.to_string()),
        None => min_max.0 = Some(value.to_string()),
        _ => {}
    }

    match &min_max.1 {
        Some(max_val) if value > max_val.as_str() => min_max.1 = Some(value.to_string()),
        None => min_max.1 = Some(value.to_string()),
        _ => {}
    }
}

pub fn merge_min_max(
    a: (Option<String>, Option<String>),
    b: (Option<String>, Option<String>)
) -> (Option<String>, Option<String>) {
    let min = match (a.0, b.0) {
        (None, None) => None,
        (Some(v), None) | (None, Some(v)) => Some(v),
        (Some(v1), Some(v2)) => Some(if v1 < v2 { v1 } else { v2 }),
    };
    let max = match (a.1, b.1) {
        (None, None) => None,
        (Some(v), None) | (None, Some(v)) => Some(v),
        (Some(v1), Some(v2)) => Some(if v1 > v2 { v1 } else { v2 }),
    };
    (min, max)
}

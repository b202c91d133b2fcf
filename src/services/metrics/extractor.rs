//! Label-based lookups over indicator tables.
//!
//! Labels are free text, so every lookup is a case-insensitive literal
//! substring match and the first row in table order wins. `Принятые ВЗ`
//! also matches `Непринятые ВЗ`; such overlaps are logged, never resolved.

use regex::{Regex, RegexBuilder};
use crate::services::excel::types::{AggregatedRow, AggregatedTable, Cell, IndicatorRow, IndicatorTable};

pub struct LabelMatcher {
    fragment: String,
    pattern: Option<Regex>,
}

impl LabelMatcher {
    pub fn new(fragment: &str) -> Self {
        let pattern = RegexBuilder::new(&regex::escape(fragment))
            .case_insensitive(true)
            .build()
            .map_err(|e| tracing::warn!("Cannot build matcher for '{}': {}", fragment, e))
            .ok();
        Self { fragment: fragment.to_string(), pattern }
    }

    pub fn is_match(&self, label: Option<&str>) -> bool {
        match (label, &self.pattern) {
            (Some(label), Some(re)) => re.is_match(label),
            _ => false,
        }
    }

    /// First matching item; logs when the fragment is ambiguous.
    pub fn first<'a, T>(
        &self,
        items: &'a [T],
        label: impl Fn(&'a T) -> Option<&'a str>,
    ) -> Option<&'a T> {
        let mut matches = items.iter().filter(|item| self.is_match(label(*item)));
        let first = matches.next()?;
        let others = matches.count();
        if others > 0 {
            tracing::warn!(
                "Label fragment '{}' matches {} rows, using '{}'",
                self.fragment,
                others + 1,
                label(first).unwrap_or_default()
            );
        }
        Some(first)
    }

    pub fn count<'a, T>(&self, items: &'a [T], label: impl Fn(&'a T) -> Option<&'a str>) -> usize {
        items.iter().filter(|item| self.is_match(label(*item))).count()
    }
}

fn aggregated_label(row: &AggregatedRow) -> Option<&str> {
    row.label.as_deref()
}

fn indicator_label(row: &IndicatorRow) -> Option<&str> {
    row.label_text()
}

/// Period sum of the first row whose label contains `fragment`; 0 on a miss.
pub fn find_scalar(aggregated: &AggregatedTable, fragment: &str) -> f64 {
    LabelMatcher::new(fragment)
        .first(&aggregated.rows, aggregated_label)
        .map(|row| row.period_sum)
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Sum over every row whose label contains `fragment`.
pub fn sum_matching(aggregated: &AggregatedTable, fragment: &str) -> f64 {
    let matcher = LabelMatcher::new(fragment);
    aggregated.rows.iter()
        .filter(|row| matcher.is_match(aggregated_label(row)))
        .map(|row| row.period_sum)
        .sum()
}

/// Rows whose label is exactly one of `names`, in table order.
pub fn find_exact<'a>(aggregated: &'a AggregatedTable, names: &[&str]) -> Vec<&'a AggregatedRow> {
    aggregated.rows.iter()
        .filter(|row| row.label.as_deref().map_or(false, |l| names.contains(&l)))
        .collect()
}

/// Per-day values of the first matching row, non-numeric cells as 0.
/// A miss yields zeros of the same length.
pub fn find_daily_series(table: &IndicatorTable, fragment: &str, columns: &[usize]) -> Vec<f64> {
    match LabelMatcher::new(fragment).first(&table.rows, indicator_label) {
        Some(row) => columns.iter()
            .map(|&col| row.cell(col).as_number().unwrap_or(0.0))
            .collect(),
        None => vec![0.0; columns.len()],
    }
}

/// Numeric reading of a percentage-style cell and whether it carried an
/// explicit `%` marker.
fn percent_cell(cell: &Cell) -> Option<(f64, bool)> {
    let value = match cell {
        Cell::Number(n) => Some((*n, false)),
        Cell::Text(s) => s.replace('%', "")
            .trim()
            .parse::<f64>()
            .ok()
            .map(|n| (n, s.contains('%'))),
        _ => None,
    };
    value.filter(|(n, _)| n.is_finite())
}

/// Average of the first matching row over `columns`, as a 0..1 fraction.
///
/// Cells that are empty or not numeric (after dropping `%`) are skipped
/// rather than counted as zero. Rows written as `NN%` strings are whole
/// percentages. Otherwise, when the mean is above 1 and the maximum above
/// 100 the values are taken as whole percentages and the mean is divided by
/// 100; else the mean is returned as is. An unmarked row such as
/// `[85, 90, 95]` therefore comes back as 90.
pub fn average_fraction(table: &IndicatorTable, fragment: &str, columns: &[usize]) -> f64 {
    if columns.is_empty() {
        return 0.0;
    }
    let row = match LabelMatcher::new(fragment).first(&table.rows, indicator_label) {
        Some(row) => row,
        None => return 0.0,
    };

    let cells: Vec<(f64, bool)> = columns.iter()
        .filter_map(|&col| percent_cell(row.cell(col)))
        .collect();
    if cells.is_empty() {
        return 0.0;
    }

    let marked = cells.iter().any(|(_, marked)| *marked);
    let mean = cells.iter().map(|(v, _)| v).sum::<f64>() / cells.len() as f64;
    let max = cells.iter().map(|(v, _)| *v).fold(f64::NEG_INFINITY, f64::max);
    if marked || (mean > 1.0 && max > 100.0) {
        mean / 100.0
    } else {
        mean
    }
}

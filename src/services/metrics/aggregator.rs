use crate::error::AppError;
use crate::services::excel::types::{AggregatedRow, AggregatedTable, DayRange, IndicatorTable, FIRST_DAY_COLUMN};
use crate::services::excel::utils::{normalize_column, ColumnIndex};

/// Day columns picked for one period, as canonical keys and as column
/// indices of the sheet they were resolved against.
#[derive(Debug, Clone, PartialEq)]
pub struct DaySelection {
    pub range: DayRange,
    pub keys: Vec<String>,
    pub columns: Vec<usize>,
}

/// Checks that the sheet has day columns at all.
pub fn check_structure(table: &IndicatorTable) -> Result<usize, AppError> {
    if table.column_count() < FIRST_DAY_COLUMN + 1 {
        return Err(AppError::Structural(format!(
            "Sheet '{}' has {} columns, at least {} expected",
            table.sheet_name,
            table.column_count(),
            FIRST_DAY_COLUMN + 1
        )));
    }
    let max_day = table.day_column_count();
    if max_day == 0 {
        return Err(AppError::Structural(format!(
            "Sheet '{}' has no day columns",
            table.sheet_name
        )));
    }
    Ok(max_day)
}

pub fn validate_range(range: DayRange, max_day: usize) -> Result<DayRange, AppError> {
    if range.start == 0 || range.start > range.end || range.end > max_day {
        return Err(AppError::InvalidInput(format!(
            "Day range {}-{} is outside 1-{}",
            range.start, range.end, max_day
        )));
    }
    Ok(range)
}

/// Resolves `range` to day columns of `table`. Columns are taken by
/// position; their normalized headers become the keys used to find the same
/// days in another sheet.
pub fn resolve_day_columns(table: &IndicatorTable, range: DayRange) -> Result<DaySelection, AppError> {
    let max_day = check_structure(table)?;
    let range = validate_range(range, max_day)?;

    let first = FIRST_DAY_COLUMN + range.start - 1;
    let last = FIRST_DAY_COLUMN + range.end - 1;
    let columns: Vec<usize> = (first..=last).collect();
    let keys: Vec<String> = table.headers[first..=last].iter().map(normalize_column).collect();

    tracing::debug!("Days {}-{} resolved to columns {:?}", range.start, range.end, columns);
    Ok(DaySelection { range, keys, columns })
}

/// Maps canonical keys onto another sheet's columns, dropping keys the
/// sheet does not have.
pub fn resolve_matching_columns(table: &IndicatorTable, keys: &[String]) -> Vec<usize> {
    ColumnIndex::build(&table.headers, table.day_columns()).resolve(keys)
}

/// One row per indicator with the sum over `columns`; cells that are not
/// numeric count as zero.
pub fn aggregate(table: &IndicatorTable, columns: &[usize]) -> AggregatedTable {
    let rows = table.rows.iter()
        .map(|row| AggregatedRow {
            label: row.label_text().map(str::to_string),
            period_sum: columns.iter()
                .map(|&col| row.cell(col).as_number().unwrap_or(0.0))
                .sum(),
        })
        .collect();
    AggregatedTable { rows }
}

use chrono::NaiveDateTime;
use serde::Serialize;
use smallvec::SmallVec;

pub const SAMPLE_SIZE: usize = 3;

/// Index of the first per-day column; column 0 holds the indicator label and
/// column 1 is metadata.
pub const FIRST_DAY_COLUMN: usize = 2;

/// A single worksheet value, detached from the reader that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    Date(NaiveDateTime),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Numeric reading used by sums: numbers and numeric strings count,
    /// everything else is `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{}", n),
            Cell::Text(s) => write!(f, "{}", s),
            Cell::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

static EMPTY_CELL: Cell = Cell::Empty;

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRow {
    pub label: Cell,
    pub cells: Vec<Cell>,
}

impl IndicatorRow {
    pub fn new(label: Cell, cells: Vec<Cell>) -> Self {
        Self { label, cells }
    }

    /// Label as used for lookups. Only text labels take part in matching.
    pub fn label_text(&self) -> Option<&str> {
        self.label.as_text()
    }

    pub fn cell(&self, column: usize) -> &Cell {
        self.cells.get(column).unwrap_or(&EMPTY_CELL)
    }
}

/// One report sheet: a header row and indicator rows. Every row's `cells`
/// is indexed by sheet column, so `cells[0]` repeats the label.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorTable {
    pub sheet_name: String,
    pub headers: Vec<Cell>,
    pub rows: Vec<IndicatorRow>,
}

impl IndicatorTable {
    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn day_column_count(&self) -> usize {
        self.column_count().saturating_sub(FIRST_DAY_COLUMN)
    }

    pub fn day_columns(&self) -> std::ops::Range<usize> {
        FIRST_DAY_COLUMN..self.column_count().max(FIRST_DAY_COLUMN)
    }
}

/// Inclusive, 1-based range of day columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayRange {
    pub start: usize,
    pub end: usize,
}

impl DayRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// `[1, min(span, max_day)]`
    pub fn default_for(max_day: usize, span: usize) -> Self {
        Self::new(1, span.max(1).min(max_day.max(1)))
    }

    pub fn days(&self) -> Vec<usize> {
        (self.start..=self.end).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedRow {
    pub label: Option<String>,
    pub period_sum: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregatedTable {
    pub rows: Vec<AggregatedRow>,
}

impl AggregatedTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Serialize)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
    pub sample_values: SmallVec<[String; SAMPLE_SIZE]>,
    pub null_count: usize,
    pub unique_count: usize,
    pub min_value: Option<String>,
    pub max_value: Option<String>,
    pub has_duplicates: bool,
}

#[derive(Debug, Serialize)]
pub struct SheetPreview {
    pub sheet_name: String,
    pub row_count: usize,
    pub column_count: usize,
    pub headers: Vec<String>,
    pub sample_data: Vec<Vec<String>>,
    pub column_info: Vec<ColumnInfo>,
}

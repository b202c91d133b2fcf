use super::types::*;
use super::utils::*;
use std::collections::HashMap;
use std::io::Cursor;
use bytes::Bytes;
use calamine::{Data, Xlsx, open_workbook_from_rs, Reader};
use crate::error::AppError;

/// Report sheets of one workbook, in workbook order.
#[derive(Debug, Clone)]
pub struct ReportWorkbook {
    pub sheet_names: Vec<String>,
    pub tables: Vec<IndicatorTable>,
}

impl ReportWorkbook {
    pub fn table(&self, sheet_name: &str) -> Option<&IndicatorTable> {
        self.tables.iter().find(|t| t.sheet_name == sheet_name)
    }
}

pub struct ExcelProcessor {
    sheet_prefix: String,
}

impl ExcelProcessor {
    pub fn new(sheet_prefix: impl Into<String>) -> Self {
        Self { sheet_prefix: sheet_prefix.into() }
    }

    pub fn process_file(&self, file_data: Bytes) -> Result<ReportWorkbook, AppError> {
        let start = std::time::Instant::now();
        let cursor = Cursor::new(file_data);

        let mut workbook: Xlsx<_> = open_workbook_from_rs(cursor)
            .map_err(|e| {
                tracing::error!("Failed to open Excel file: {}", e);
                AppError::FileProcessingError(format!("Failed to open Excel file: {}", e))
            })?;

        let all_sheets = workbook.sheet_names().to_vec();
        let sheet_names = qualifying_sheets(&all_sheets, &self.sheet_prefix);
        tracing::info!(
            "Found {} sheets, {} start with '{}'",
            all_sheets.len(),
            sheet_names.len(),
            self.sheet_prefix
        );

        if sheet_names.is_empty() {
            return Err(AppError::Structural(format!(
                "No sheets starting with '{}' found in workbook",
                self.sheet_prefix
            )));
        }

        let mut tables = Vec::with_capacity(sheet_names.len());
        for sheet_name in &sheet_names {
            match workbook.worksheet_range(sheet_name) {
                Ok(range) => {
                    let rows: Vec<Vec<Data>> = range.rows().map(|row| row.to_vec()).collect();
                    tracing::debug!("Sheet {} has {} rows", sheet_name, rows.len());
                    tables.push(build_table(sheet_name, &rows));
                }
                Err(e) => {
                    tracing::warn!("Failed to read worksheet {}: {}", sheet_name, e);
                    tables.push(build_table(sheet_name, &[]));
                }
            }
        }

        tracing::info!("Workbook parsed in {:?}", start.elapsed());
        Ok(ReportWorkbook { sheet_names, tables })
    }
}

pub fn qualifying_sheets(names: &[String], prefix: &str) -> Vec<String> {
    names.iter().filter(|name| name.starts_with(prefix)).cloned().collect()
}

/// Renames repeated headers to `X`, `X.1`, `X.2`, ... so every column keeps
/// its own name. A generated name that collides with a later header is
/// suffixed again.
pub fn dedup_headers(headers: Vec<Cell>) -> Vec<Cell> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    headers.into_iter()
        .map(|header| {
            let mut name = header.to_string();
            let mut count = counts.get(&name).copied().unwrap_or(0);
            if count == 0 {
                counts.insert(name, 1);
                return header;
            }
            while count > 0 {
                counts.insert(name.clone(), count + 1);
                name = format!("{}.{}", name, count);
                count = counts.get(&name).copied().unwrap_or(0);
            }
            counts.insert(name.clone(), count + 1);
            Cell::Text(name)
        })
        .collect()
}

/// First row is the header row; every other row is an indicator. Blank
/// header cells get pandas-style `Unnamed: N` names and repeated ones are
/// renamed by [`dedup_headers`].
pub fn build_table(sheet_name: &str, rows: &[Vec<Data>]) -> IndicatorTable {
    let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);

    let headers: Vec<Cell> = match rows.first() {
        Some(header_row) => (0..width)
            .map(|idx| match header_row.get(idx).map(to_cell) {
                Some(Cell::Empty) | None => Cell::Text(format!("Unnamed: {}", idx)),
                Some(cell) => cell,
            })
            .collect(),
        None => Vec::new(),
    };
    let headers = dedup_headers(headers);

    let rows = rows.iter()
        .skip(1)
        .map(|row| {
            let cells: Vec<Cell> = (0..width)
                .map(|idx| row.get(idx).map(to_cell).unwrap_or(Cell::Empty))
                .collect();
            let label = cells.first().cloned().unwrap_or(Cell::Empty);
            IndicatorRow::new(label, cells)
        })
        .collect();

    IndicatorTable {
        sheet_name: sheet_name.to_string(),
        headers,
        rows,
    }
}

pub fn to_cell(value: &Data) -> Cell {
    match value {
        Data::Empty => Cell::Empty,
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Bool(*b),
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::DateTime(d) => excel_serial_to_datetime(d.as_f64())
            .map(Cell::Date)
            .unwrap_or(Cell::Empty),
        Data::DateTimeIso(s) => parse_date_string(s)
            .map(Cell::Date)
            .unwrap_or_else(|| Cell::Text(s.clone())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Empty,
    }
}

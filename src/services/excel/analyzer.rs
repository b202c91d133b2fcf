use super::types::*;
use super::utils::*;
use std::collections::HashSet;
use smallvec::SmallVec;
use rayon::prelude::*;

const TYPE_DETECTION_ROWS: usize = 100;
const PREVIEW_ROWS: usize = 5;

/// Builds the raw-data preview of a report sheet: the first rows as text and
/// a profile of every column.
pub struct SheetProfiler;

impl SheetProfiler {
    pub fn preview(&self, table: &IndicatorTable) -> SheetPreview {
        let start = std::time::Instant::now();

        let headers: Vec<String> = table.headers.iter().map(|h| h.to_string()).collect();

        let sample_data: Vec<Vec<String>> = table.rows.iter()
            .take(PREVIEW_ROWS)
            .map(|row| row.cells.iter().map(|cell| cell.to_string()).collect())
            .collect();

        let column_info = headers.iter().enumerate()
            .map(|(idx, name)| {
                let values: Vec<Cell> = table.rows.iter()
                    .map(|row| row.cell(idx).clone())
                    .collect();
                self.analyze_column(&values, name)
            })
            .collect();

        tracing::debug!("Profiled sheet {} in {:?}", table.sheet_name, start.elapsed());

        SheetPreview {
            sheet_name: table.sheet_name.clone(),
            row_count: table.rows.len(),
            column_count: table.column_count(),
            headers,
            sample_data,
            column_info,
        }
    }

    fn analyze_column(&self, values: &[Cell], name: &str) -> ColumnInfo {
        let (null_count, seen_values, min_max) = values.par_iter()
            .fold(
                || (0, HashSet::new(), (None, None)),
                |(mut nulls, mut seen, mut min_max), value| {
                    if value.is_empty() {
                        nulls += 1;
                    } else {
                        let str_value = value.to_string();
                        update_min_max(&mut min_max, &str_value);
                        seen.insert(str_value);
                    }
                    (nulls, seen, min_max)
                }
            )
            .reduce(
                || (0, HashSet::new(), (None, None)),
                |a, b| {
                    let mut combined_set = a.1;
                    combined_set.extend(b.1);
                    (a.0 + b.0, combined_set, merge_min_max(a.2, b.2))
                }
            );

        let sample_values: SmallVec<[String; SAMPLE_SIZE]> = values.iter()
            .take(SAMPLE_SIZE)
            .map(|value| value.to_string())
            .collect();

        ColumnInfo {
            name: name.to_string(),
            data_type: self.detect_column_type(values).to_string(),
            sample_values,
            null_count,
            unique_count: seen_values.len(),
            min_value: min_max.0,
            max_value: min_max.1,
            has_duplicates: seen_values.len() < values.len() - null_count,
        }
    }

    fn detect_column_type(&self, values: &[Cell]) -> &'static str {
        let (numeric_count, date_count, bool_count, total) = values.par_iter()
            .take(TYPE_DETECTION_ROWS)
            .filter(|v| !v.is_empty())
            .fold(
                || (0usize, 0usize, 0usize, 0usize),
                |(mut num, mut date, mut bool, mut total), value| {
                    total += 1;
                    match value {
                        Cell::Number(_) => num += 1,
                        Cell::Date(_) => date += 1,
                        Cell::Text(s) if is_date_string(s) => date += 1,
                        Cell::Text(s) if s.trim_end_matches('%').trim().parse::<f64>().is_ok() => num += 1,
                        Cell::Bool(_) => bool += 1,
                        _ => {}
                    }
                    (num, date, bool, total)
                }
            )
            .reduce(|| (0, 0, 0, 0),
                |a, b| (a.0 + b.0, a.1 + b.1, a.2 + b.2, a.3 + b.3)
            );

        if total == 0 {
            return "empty";
        }

        let threshold = total as f64 * 0.8;
        match () {
            _ if numeric_count as f64 >= threshold => "numeric",
            _ if date_count as f64 >= threshold => "date",
            _ if bool_count as f64 >= threshold => "boolean",
            _ => "string",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> IndicatorTable {
        let headers = vec![
            Cell::text("Показатель"),
            Cell::text("Ед."),
            Cell::text("2024-03-01"),
            Cell::text("2024-03-02"),
        ];
        let row = |label: &str, a: Cell, b: Cell| {
            IndicatorRow::new(Cell::text(label), vec![Cell::text(label), Cell::Empty, a, b])
        };
        IndicatorTable {
            sheet_name: "Отчет Март".to_string(),
            headers,
            rows: vec![
                row("Входящие звонки - ВЗ", Cell::Number(10.0), Cell::Number(20.0)),
                row("Принятые ВЗ", Cell::Number(8.0), Cell::Number(8.0)),
                row("Выполнение скрипта Мади", Cell::text("85%"), Cell::Empty),
            ],
        }
    }

    #[test]
    fn preview_profiles_every_column() {
        let preview = SheetProfiler.preview(&table());
        assert_eq!(preview.row_count, 3);
        assert_eq!(preview.column_count, 4);
        assert_eq!(preview.column_info.len(), 4);

        let label = &preview.column_info[0];
        assert_eq!(label.data_type, "string");
        assert_eq!(label.unique_count, 3);
        assert!(!label.has_duplicates);

        let meta = &preview.column_info[1];
        assert_eq!(meta.data_type, "empty");
        assert_eq!(meta.null_count, 3);

        let day_two = &preview.column_info[3];
        assert_eq!(day_two.data_type, "numeric");
        assert_eq!(day_two.null_count, 1);
        assert!(!day_two.has_duplicates);
        assert_eq!(day_two.min_value.as_deref(), Some("20"));
        assert_eq!(day_two.max_value.as_deref(), Some("8"));
    }

    #[test]
    fn preview_keeps_first_rows_as_text() {
        let preview = SheetProfiler.preview(&table());
        assert_eq!(preview.sample_data[2][2], "85%");
        assert_eq!(preview.sample_data[0][2], "10");
        assert_eq!(preview.column_info[2].sample_values.as_slice(), ["10", "8", "85%"]);
    }
}

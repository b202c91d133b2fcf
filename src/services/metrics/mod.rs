pub mod aggregator;
pub mod derived;
pub mod extractor;

pub use aggregator::{aggregate, resolve_day_columns, resolve_matching_columns, DaySelection};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::services::excel::types::*;

    /// Sheet with `Показатель | Ед. | 2024-03-01 | 2024-03-02 | ...` headers;
    /// each row's values start at the first day column.
    pub fn table(rows: &[(&str, Vec<Cell>)]) -> IndicatorTable {
        let days = rows.iter().map(|(_, values)| values.len()).max().unwrap_or(0);
        let mut headers = vec![Cell::text("Показатель"), Cell::text("Ед.")];
        headers.extend((1..=days).map(|day| Cell::Text(format!("2024-03-{:02}", day))));

        let rows = rows.iter()
            .map(|(label, values)| {
                let mut cells = vec![Cell::text(*label), Cell::Empty];
                cells.extend(values.iter().cloned());
                cells.resize(FIRST_DAY_COLUMN + days, Cell::Empty);
                IndicatorRow::new(Cell::text(*label), cells)
            })
            .collect();

        IndicatorTable {
            sheet_name: "Отчет Март 2024".to_string(),
            headers,
            rows,
        }
    }

    pub fn aggregated(rows: &[(&str, f64)]) -> AggregatedTable {
        AggregatedTable {
            rows: rows.iter()
                .map(|(label, sum)| AggregatedRow {
                    label: Some(label.to_string()),
                    period_sum: *sum,
                })
                .collect(),
        }
    }
}

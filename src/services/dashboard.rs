use serde::Deserialize;
use crate::error::AppError;
use crate::models::Dashboard;
use crate::services::excel::types::{AggregatedTable, DayRange, IndicatorTable};
use crate::services::excel::{ReportWorkbook, SheetProfiler};
use crate::services::metrics::{aggregate, derived, resolve_day_columns, resolve_matching_columns, DaySelection};
use crate::services::sheet_selector::previous_sheet;

/// Which dashboard sections to compute. Missing fields keep their default:
/// everything on except the raw-data preview.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Sections {
    pub metrics: bool,
    pub data_preview: bool,
    pub dynamics: bool,
    pub funnel: bool,
    pub staff: bool,
    pub internet: bool,
    pub scripts: bool,
    pub sales_funnel: bool,
    pub reasons: bool,
}

impl Default for Sections {
    fn default() -> Self {
        Self {
            metrics: true,
            data_preview: false,
            dynamics: true,
            funnel: true,
            staff: true,
            internet: true,
            scripts: true,
            sales_funnel: true,
            reasons: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub sheet: Option<String>,
    pub start_day: Option<usize>,
    pub end_day: Option<usize>,
    pub sections: Sections,
    pub default_day_span: usize,
}

/// Runs one section builder. A failing section is logged and left out so the
/// rest of the dashboard still renders.
fn section<T>(enabled: bool, name: &str, build: impl FnOnce() -> Result<Option<T>, AppError>) -> Option<T> {
    if !enabled {
        return None;
    }
    match build() {
        Ok(value) => {
            if value.is_none() {
                tracing::debug!("Section {} has no data", name);
            }
            value
        }
        Err(e) => {
            tracing::error!("Failed to build section {}: {}", name, e);
            None
        }
    }
}

fn pick_sheet<'a>(workbook: &'a ReportWorkbook, requested: Option<&str>) -> Result<&'a IndicatorTable, AppError> {
    let name = match requested {
        Some(name) => name,
        None => workbook.sheet_names.first()
            .map(String::as_str)
            .ok_or_else(|| AppError::Structural("Workbook has no report sheets".to_string()))?,
    };
    workbook.table(name)
        .ok_or_else(|| AppError::InvalidInput(format!("Sheet '{}' is not a report sheet", name)))
}

fn requested_range(table: &IndicatorTable, options: &RenderOptions) -> DayRange {
    let default = DayRange::default_for(table.day_column_count(), options.default_day_span);
    DayRange::new(
        options.start_day.unwrap_or(default.start),
        options.end_day.unwrap_or(default.end),
    )
}

fn previous_period(previous: Option<&IndicatorTable>, selection: &DaySelection) -> Option<AggregatedTable> {
    let table = previous?;
    let columns = resolve_matching_columns(table, &selection.keys);
    if columns.is_empty() {
        tracing::warn!("Previous sheet {} has none of the selected days", table.sheet_name);
        return None;
    }
    let aggregated = aggregate(table, &columns);
    if aggregated.is_empty() {
        tracing::warn!("Previous sheet {} produced no rows", table.sheet_name);
        return None;
    }
    Some(aggregated)
}

/// Load → normalize → aggregate → derive, for one sheet and day range.
pub fn render(workbook: &ReportWorkbook, options: &RenderOptions) -> Result<Dashboard, AppError> {
    let start = std::time::Instant::now();
    let table = pick_sheet(workbook, options.sheet.as_deref())?;
    let previous_name = previous_sheet(&table.sheet_name, &workbook.sheet_names).cloned();
    let previous_table = previous_name.as_deref().and_then(|name| workbook.table(name));

    let selection = resolve_day_columns(table, requested_range(table, options))?;
    let current = aggregate(table, &selection.columns);
    if current.is_empty() {
        return Err(AppError::Structural(format!(
            "Sheet '{}' has no indicator rows",
            table.sheet_name
        )));
    }
    let previous = previous_period(previous_table, &selection);

    tracing::info!(
        "Rendering {} (previous: {}) days {}-{}",
        table.sheet_name,
        previous_name.as_deref().unwrap_or("none"),
        selection.range.start,
        selection.range.end
    );

    let sections = options.sections;
    let range = selection.range;
    let columns = &selection.columns;

    let dashboard = Dashboard {
        sheet: table.sheet_name.clone(),
        previous_sheet: previous_name.clone(),
        day_range: range,
        max_day: table.day_column_count(),
        selected_columns: columns.iter().map(|&col| table.headers[col].to_string()).collect(),
        has_previous_period: previous.is_some(),
        call_metrics: section(sections.metrics, "call_metrics", || {
            Ok(Some(derived::call_metrics(&current, previous.as_ref())))
        }),
        ad_spend: section(sections.metrics, "ad_spend", || Ok(Some(derived::ad_spend_metrics(&current)))),
        data_preview: section(sections.data_preview, "data_preview", || Ok(Some(SheetProfiler.preview(table)))),
        dynamics: section(sections.dynamics, "dynamics", || {
            derived::call_dynamics(table, columns, range).map(Some)
        }),
        funnel: section(sections.funnel, "funnel", || Ok(Some(derived::processing_funnel(&current, range)))),
        staff: section(sections.staff, "staff", || Ok(derived::staff_breakdown(&current, range))),
        internet: section(sections.internet, "internet", || Ok(derived::internet_leads(&current, range))),
        scripts: section(sections.scripts, "scripts", || {
            Ok(Some(derived::script_adherence(table, columns, range)))
        }),
        sales_funnel: section(sections.sales_funnel, "sales_funnel", || Ok(derived::sales_funnel(&current, range))),
        reasons: section(sections.reasons, "reasons", || {
            Ok(derived::rejection_reasons(table, &current, range))
        }),
    };

    tracing::info!("Dashboard for {} rendered in {:?}", dashboard.sheet, start.elapsed());
    Ok(dashboard)
}

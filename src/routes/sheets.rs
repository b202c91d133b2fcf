use axum::{
    extract::State,
    routing::post,
    Router,
    Json,
    http::Method,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use crate::{
    AppState,
    error::AppError,
    models::Dashboard,
    services::{
        dashboard::{self, RenderOptions, Sections},
        file_processor::WorkbookSource,
        sheet_selector::previous_sheet,
    },
};
use tower_http::cors::{CorsLayer, Any};

pub fn routes() -> Router<Arc<AppState>> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/sheets", post(list_sheets))
        .route("/dashboard", post(render_dashboard))
        .layer(cors)
}

#[derive(Debug, Serialize)]
pub struct SheetEntry {
    name: String,
    previous_sheet: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SheetsResponse {
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
pub struct DashboardRequest {
    #[serde(flatten)]
    source: WorkbookSource,
    #[serde(default)]
    sheet: Option<String>,
    #[serde(default)]
    start_day: Option<usize>,
    #[serde(default)]
    end_day: Option<usize>,
    #[serde(default)]
    sections: Sections,
}

async fn list_sheets(
    State(state): State<Arc<AppState>>,
    Json(source): Json<WorkbookSource>,
) -> Result<Json<SheetsResponse>, AppError> {
    let workbook = state.workbooks.load(&source).await?;
    let sheets = workbook.sheet_names.iter()
        .map(|name| SheetEntry {
            name: name.clone(),
            previous_sheet: previous_sheet(name, &workbook.sheet_names).cloned(),
        })
        .collect();
    Ok(Json(SheetsResponse { sheets }))
}

async fn render_dashboard(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DashboardRequest>,
) -> Result<Json<Dashboard>, AppError> {
    let start = std::time::Instant::now();
    let workbook = state.workbooks.load(&request.source).await?;

    let options = RenderOptions {
        sheet: request.sheet,
        start_day: request.start_day,
        end_day: request.end_day,
        sections: request.sections,
        default_day_span: state.config.default_day_span,
    };
    let dashboard = dashboard::render(&workbook, &options)?;

    tracing::info!("Dashboard request completed in {:?}", start.elapsed());
    Ok(Json(dashboard))
}

use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

mod config;
mod error;
mod logging;
mod routes;
mod services;
pub mod models;

use services::file_processor::WorkbookStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    logging::init_logging()?;

    // Load configuration
    let config = config::load_config()?;
    let addr = config.addr;

    // Build our application state
    let state = Arc::new(AppState::new(config));
    let app = router(state);

    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::routes())
        .merge(routes::sheets::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Application state
#[derive(Clone)]
pub struct AppState {
    config: config::Config,
    workbooks: WorkbookStore,
}

impl AppState {
    fn new(config: config::Config) -> Self {
        let workbooks = WorkbookStore::new(
            config.workbook_cache_capacity,
            config.sheet_prefix.clone(),
            config.max_file_size,
        );
        Self { config, workbooks }
    }
}

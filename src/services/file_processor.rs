use std::path::{Path, PathBuf};
use std::sync::Arc;
use bytes::Bytes;
use moka::sync::Cache;
use reqwest::Client;
use serde::Deserialize;
use crate::error::AppError;
use crate::services::excel::{ExcelProcessor, ReportWorkbook};

/// Where a workbook comes from. Exactly one of the fields must be set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkbookSource {
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}

enum Location<'a> {
    Url(&'a str),
    Path(&'a PathBuf),
}

impl WorkbookSource {
    fn location(&self) -> Result<Location<'_>, AppError> {
        match (&self.file_url, &self.file_path) {
            (Some(url), None) => Ok(Location::Url(url)),
            (None, Some(path)) => Ok(Location::Path(path)),
            (Some(_), Some(_)) => Err(AppError::InvalidInput(
                "Provide either file_url or file_path, not both".to_string(),
            )),
            (None, None) => Err(AppError::InvalidInput("No file provided".to_string())),
        }
    }

    pub fn is_xlsx(&self) -> bool {
        let name = match (&self.file_url, &self.file_path) {
            (Some(url), _) => url.split('?').next().unwrap_or_default().to_lowercase(),
            (None, Some(path)) => path.to_string_lossy().to_lowercase(),
            (None, None) => return false,
        };
        name.ends_with(".xlsx")
    }
}

pub async fn load_file_from_url(url: &str, max_file_size: usize) -> Result<Bytes, AppError> {
    let client = Client::new();
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(AppError::HttpError(
            format!("Failed to fetch file. Status: {}", response.status())
        ));
    }

    if let Some(length) = response.content_length() {
        check_size(length as usize, max_file_size)?;
    }

    let bytes = response.bytes().await?;
    check_size(bytes.len(), max_file_size)?;
    Ok(bytes)
}

/// `NotFound` becomes invalid input; other I/O errors pass through.
fn path_error(path: &Path, err: std::io::Error) -> AppError {
    if err.kind() == std::io::ErrorKind::NotFound {
        AppError::InvalidInput(format!("File not found: {}", path.display()))
    } else {
        AppError::IoError(err)
    }
}

pub async fn load_file_from_path(path: &Path, max_file_size: usize) -> Result<Bytes, AppError> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| path_error(path, e))?;
    check_size(metadata.len() as usize, max_file_size)?;
    let data = tokio::fs::read(path).await.map_err(|e| path_error(path, e))?;
    Ok(Bytes::from(data))
}

fn check_size(size: usize, max_file_size: usize) -> Result<(), AppError> {
    if size > max_file_size {
        return Err(AppError::InvalidInput(format!(
            "File is {}KB, limit is {}KB",
            size / 1024,
            max_file_size / 1024
        )));
    }
    Ok(())
}

/// Parsed workbooks keyed by source, so changing the day range or toggling
/// sections does not re-read the file.
#[derive(Clone)]
pub struct WorkbookStore {
    cache: Cache<String, Arc<ReportWorkbook>>,
    sheet_prefix: String,
    max_file_size: usize,
}

impl WorkbookStore {
    pub fn new(capacity: u64, sheet_prefix: impl Into<String>, max_file_size: usize) -> Self {
        Self {
            cache: Cache::builder().max_capacity(capacity).build(),
            sheet_prefix: sheet_prefix.into(),
            max_file_size,
        }
    }

    async fn cache_key(&self, source: &WorkbookSource) -> Result<String, AppError> {
        match source.location()? {
            Location::Url(url) => Ok(format!("url:{}", url)),
            Location::Path(path) => {
                let metadata = tokio::fs::metadata(path).await.map_err(|e| path_error(path, e))?;
                let modified = metadata.modified().ok();
                Ok(format!("path:{}@{:?}", path.display(), modified))
            }
        }
    }

    pub async fn load(&self, source: &WorkbookSource) -> Result<Arc<ReportWorkbook>, AppError> {
        if !source.is_xlsx() {
            return Err(AppError::InvalidInput("Only XLSX files are supported".to_string()));
        }

        let key = self.cache_key(source).await?;
        if let Some(workbook) = self.cache.get(&key) {
            tracing::debug!("Workbook cache hit for {}", key);
            return Ok(workbook);
        }

        let start = std::time::Instant::now();
        let data = match source.location()? {
            Location::Url(url) => load_file_from_url(url, self.max_file_size).await?,
            Location::Path(path) => load_file_from_path(path, self.max_file_size).await?,
        };
        tracing::info!("Workbook loaded, size: {}KB, took: {:?}", data.len() / 1024, start.elapsed());

        let processor = ExcelProcessor::new(self.sheet_prefix.clone());
        let workbook = tokio::task::spawn_blocking(move || processor.process_file(data))
            .await
            .map_err(|e| AppError::Internal(format!("Workbook parsing task failed: {}", e)))??;

        let workbook = Arc::new(workbook);
        self.cache.insert(key, workbook.clone());
        Ok(workbook)
    }
}

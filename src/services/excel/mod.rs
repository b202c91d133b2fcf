pub mod analyzer;
pub mod processor;
pub mod types;
pub mod utils;

pub use analyzer::SheetProfiler;
pub use processor::{ExcelProcessor, ReportWorkbook};

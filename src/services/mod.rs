pub mod dashboard;
pub mod excel;
pub mod file_processor;
pub mod metrics;
pub mod sheet_selector;

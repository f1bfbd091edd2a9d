//! Data module - file ingestion, formats and cleaning

pub mod cell;
mod format;
mod loader;
mod processor;

pub use format::FileFormat;
pub use loader::{column_names, numeric_columns, DataLoader, UploadedFile};
pub use processor::{DataProcessor, FillReport, ProcessorError};

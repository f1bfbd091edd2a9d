//! Tabular File Formats
//! The closed set of formats the sweeper reads and writes.

use crate::data::loader::{self, LoaderError};
use crate::export::{self, ExportError};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CSV_MIME: &str = "text/csv";
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Unsupported file type: .{0}")]
    Unsupported(String),
}

/// Supported tabular formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileFormat {
    /// Comma-separated values
    #[default]
    Csv,
    /// Office Open XML workbook (.xlsx)
    Spreadsheet,
}

impl FileFormat {
    pub const ALL: [FileFormat; 2] = [FileFormat::Csv, FileFormat::Spreadsheet];

    /// Dispatch on the (case-insensitive) file extension.
    pub fn from_extension(ext: &str) -> Result<Self, FormatError> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Ok(FileFormat::Csv),
            "xlsx" => Ok(FileFormat::Spreadsheet),
            other => Err(FormatError::Unsupported(other.to_string())),
        }
    }

    pub fn from_file_name(name: &str) -> Result<Self, FormatError> {
        Self::from_extension(&extension_of(name))
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Csv => "csv",
            FileFormat::Spreadsheet => "xlsx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            FileFormat::Csv => CSV_MIME,
            FileFormat::Spreadsheet => XLSX_MIME,
        }
    }

    /// Label used on the conversion radio buttons.
    pub fn label(&self) -> &'static str {
        match self {
            FileFormat::Csv => "CSV",
            FileFormat::Spreadsheet => "Excel",
        }
    }

    /// Parse raw file bytes into a table.
    pub fn decode(&self, bytes: &[u8], infer_schema_length: usize) -> Result<DataFrame, LoaderError> {
        match self {
            FileFormat::Csv => loader::read_csv(bytes, infer_schema_length),
            FileFormat::Spreadsheet => loader::read_spreadsheet(bytes),
        }
    }

    /// Serialize a table, without any row-index column.
    pub fn encode(&self, df: &DataFrame) -> Result<Vec<u8>, ExportError> {
        match self {
            FileFormat::Csv => export::write_csv(df),
            FileFormat::Spreadsheet => export::write_xlsx(df),
        }
    }
}

/// Lower-cased text after the last `.`, or empty when there is none.
pub fn extension_of(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatches_on_extension_case_insensitively() {
        assert_eq!(FileFormat::from_file_name("data.csv"), Ok(FileFormat::Csv));
        assert_eq!(
            FileFormat::from_file_name("Report.XLSX"),
            Ok(FileFormat::Spreadsheet)
        );
    }

    #[test]
    fn rejects_other_extensions_by_name() {
        let err = FileFormat::from_file_name("notes.txt").unwrap_err();
        assert_eq!(err, FormatError::Unsupported("txt".into()));
        assert_eq!(err.to_string(), "Unsupported file type: .txt");

        assert!(FileFormat::from_file_name("legacy.xls").is_err());
        assert!(FileFormat::from_file_name("no_extension").is_err());
    }

    #[test]
    fn extension_ignores_leading_dot_files() {
        assert_eq!(extension_of(".csv"), "");
        assert_eq!(extension_of("a.b.CSV"), "csv");
    }

    #[test]
    fn csv_is_the_default_format() {
        assert_eq!(FileFormat::default(), FileFormat::Csv);
    }

    #[test]
    fn mime_types() {
        assert_eq!(FileFormat::Csv.mime_type(), "text/csv");
        assert_eq!(
            FileFormat::Spreadsheet.mime_type(),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
    }
}

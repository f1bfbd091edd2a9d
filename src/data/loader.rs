//! Tabular File Loader Module
//! Handles CSV and XLSX ingestion and column extraction using Polars.

use crate::data::cell::is_numeric_dtype;
use crate::data::format::{FileFormat, FormatError};
use calamine::{open_workbook_from_rs, Data, Reader, Xlsx, XlsxError};
use polars::prelude::*;
use std::collections::HashSet;
use std::io::Cursor;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("Failed to parse table: {0}")]
    Polars(#[from] PolarsError),
    #[error("Failed to read spreadsheet: {0}")]
    Spreadsheet(#[from] XlsxError),
    #[error("Workbook contains no sheets")]
    NoSheets,
    #[error("First sheet has no header row")]
    NoHeader,
}

/// A file handed to the sweeper by the user, held in memory only.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn size_kb(&self) -> f64 {
        self.bytes.len() as f64 / 1024.0
    }
}

/// Reads uploaded files into DataFrames.
pub struct DataLoader {
    infer_schema_length: usize,
}

impl DataLoader {
    pub fn new(infer_schema_length: usize) -> Self {
        Self {
            infer_schema_length,
        }
    }

    /// Dispatch on the file extension and parse the bytes.
    pub fn load(&self, file: &UploadedFile) -> Result<DataFrame, LoaderError> {
        let format = FileFormat::from_file_name(&file.name)?;
        let df = format.decode(&file.bytes, self.infer_schema_length)?;
        log::info!(
            "Loaded {} as {}: {} rows, {} columns",
            file.name,
            format.label(),
            df.height(),
            df.width()
        );
        Ok(df)
    }
}

/// Parse CSV bytes with the first row as header.
pub fn read_csv(bytes: &[u8], infer_schema_length: usize) -> Result<DataFrame, LoaderError> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(infer_schema_length))
        .into_reader_with_file_handle(Cursor::new(bytes.to_vec()))
        .finish()?;
    Ok(df)
}

/// Parse the first worksheet of an XLSX workbook with the first row as header.
pub fn read_spreadsheet(bytes: &[u8]) -> Result<DataFrame, LoaderError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes))?;
    let range = workbook.worksheet_range_at(0).ok_or(LoaderError::NoSheets)??;

    let mut rows = range.rows();
    let header = rows.next().ok_or(LoaderError::NoHeader)?;
    let names = header_names(header);

    let mut cells: Vec<Vec<Option<&Data>>> = vec![Vec::new(); names.len()];
    for row in rows {
        for (i, column) in cells.iter_mut().enumerate() {
            column.push(row.get(i).filter(|c| !is_missing(c)));
        }
    }

    let columns = names
        .iter()
        .zip(cells.iter())
        .map(|(name, values)| build_column(name, values))
        .collect();

    Ok(DataFrame::new(columns)?)
}

/// Header texts with blanks named `Unnamed: i` and repeats suffixed `.1`, `.2`, ...
fn header_names(header: &[Data]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(header.len());

    for (i, cell) in header.iter().enumerate() {
        let base = if is_missing(cell) {
            format!("Unnamed: {}", i)
        } else {
            cell.to_string()
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        seen.insert(name.clone());
        names.push(name);
    }

    names
}

fn is_missing(cell: &Data) -> bool {
    match cell {
        Data::Empty | Data::Error(_) => true,
        Data::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Inferred type of a spreadsheet column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CellKind {
    Empty,
    Int,
    Float,
    Bool,
    Text,
}

impl CellKind {
    fn of(cell: &Data) -> Self {
        match cell {
            Data::Int(_) => CellKind::Int,
            Data::Float(f) if is_integral(*f) => CellKind::Int,
            Data::Float(_) => CellKind::Float,
            Data::Bool(_) => CellKind::Bool,
            _ => CellKind::Text,
        }
    }

    fn merge(self, other: CellKind) -> CellKind {
        match (self, other) {
            (CellKind::Empty, k) | (k, CellKind::Empty) => k,
            (a, b) if a == b => a,
            (CellKind::Int, CellKind::Float) | (CellKind::Float, CellKind::Int) => CellKind::Float,
            _ => CellKind::Text,
        }
    }
}

fn is_integral(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15
}

fn build_column(name: &str, cells: &[Option<&Data>]) -> Column {
    let kind = cells
        .iter()
        .flatten()
        .fold(CellKind::Empty, |acc, cell| acc.merge(CellKind::of(cell)));

    match kind {
        CellKind::Int => {
            let values: Vec<Option<i64>> = cells
                .iter()
                .map(|c| match c {
                    Some(Data::Int(i)) => Some(*i),
                    Some(Data::Float(f)) => Some(*f as i64),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), values)
        }
        CellKind::Float | CellKind::Empty => {
            let values: Vec<Option<f64>> = cells
                .iter()
                .map(|c| match c {
                    Some(Data::Int(i)) => Some(*i as f64),
                    Some(Data::Float(f)) => Some(*f),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), values)
        }
        CellKind::Bool => {
            let values: Vec<Option<bool>> = cells
                .iter()
                .map(|c| match c {
                    Some(Data::Bool(b)) => Some(*b),
                    _ => None,
                })
                .collect();
            Column::new(name.into(), values)
        }
        CellKind::Text => {
            let values: Vec<Option<String>> =
                cells.iter().map(|c| c.map(|d| d.to_string())).collect();
            Column::new(name.into(), values)
        }
    }
}

/// Get list of column names from a DataFrame.
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Get list of numeric column names.
pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| is_numeric_dtype(col.dtype()))
        .map(|col| col.name().to_string())
        .collect()
}

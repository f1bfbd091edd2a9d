//! Data Processor Module
//! Handles data cleaning: de-duplication, mean fill and column selection.

use crate::data::cell::is_numeric_dtype;
use polars::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Column '{0}' not found")]
    ColumnNotFound(String),
}

/// Outcome of a mean fill.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FillReport {
    /// Columns that had missing cells replaced, with the fill value used
    pub filled: Vec<(String, f64)>,
    /// Numeric columns with no present value; these stay missing
    pub skipped: Vec<String>,
}

impl FillReport {
    pub fn summary(&self) -> String {
        let mut text = if self.filled.is_empty() {
            "No missing numeric values to fill".to_string()
        } else {
            let names: Vec<&str> = self.filled.iter().map(|(n, _)| n.as_str()).collect();
            format!("Missing values have been filled in: {}", names.join(", "))
        };
        if !self.skipped.is_empty() {
            text.push_str(&format!(
                " (left empty, no values to average: {})",
                self.skipped.join(", ")
            ));
        }
        text
    }
}

/// Handles data cleaning operations.
pub struct DataProcessor;

impl DataProcessor {
    /// Drop rows that repeat an earlier row in every column; first occurrence wins.
    pub fn remove_duplicates(df: &DataFrame) -> Result<DataFrame, ProcessorError> {
        let deduped = df
            .clone()
            .lazy()
            .unique_stable(None, UniqueKeepStrategy::First)
            .collect()?;
        Ok(deduped)
    }

    /// Replace missing cells of each numeric column with that column's mean.
    ///
    /// NaN counts as missing. The mean is taken over finite present values.
    /// Columns with no missing cells keep their type. Filled columns become
    /// Float64. A numeric column with no finite value is left missing.
    pub fn fill_missing(df: &DataFrame) -> Result<(DataFrame, FillReport), ProcessorError> {
        let mut result = df.clone();
        let mut report = FillReport::default();

        for column in df.get_columns() {
            if !is_numeric_dtype(column.dtype()) {
                continue;
            }

            let as_float = column.as_materialized_series().cast(&DataType::Float64)?;
            let values: Float64Chunked = as_float
                .f64()?
                .into_iter()
                .map(|v| v.filter(|x| !x.is_nan()))
                .collect();
            let missing = values.null_count();
            if missing == 0 {
                continue;
            }

            let name = column.name().to_string();
            let Some(mean) = finite_mean(&values) else {
                report.skipped.push(name);
                continue;
            };

            let filled = values
                .fill_null_with_values(mean)?
                .with_name(column.name().clone());
            result.with_column(filled.into_series())?;

            log::debug!("Filled {} missing cells in '{}' with {}", missing, name, mean);
            report.filled.push((name, mean));
        }

        Ok((result, report))
    }

    /// Restrict to `selection`, keeping the table's own column order.
    pub fn select_columns(
        df: &DataFrame,
        selection: &[String],
    ) -> Result<DataFrame, ProcessorError> {
        let existing: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        if let Some(unknown) = selection.iter().find(|s| !existing.contains(s)) {
            return Err(ProcessorError::ColumnNotFound(unknown.clone()));
        }

        let ordered: Vec<String> = existing
            .into_iter()
            .filter(|name| selection.contains(name))
            .collect();

        Ok(df.select(ordered)?)
    }
}

/// Running mean of the finite values; stays finite for extreme inputs.
fn finite_mean(values: &Float64Chunked) -> Option<f64> {
    let mut mean = 0.0;
    let mut count = 0usize;
    for v in values.into_iter().flatten().filter(|v| v.is_finite()) {
        count += 1;
        mean += v / count as f64 - mean / count as f64;
    }
    (count > 0).then_some(mean)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(df: &DataFrame) -> Vec<String> {
        df.get_column_names().iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn remove_duplicates_keeps_first_occurrence() {
        let df = df!("id" => ["a", "a", "b"], "val" => [1i64, 1, 2]).unwrap();
        let out = DataProcessor::remove_duplicates(&df).unwrap();

        let expected = df!("id" => ["a", "b"], "val" => [1i64, 2]).unwrap();
        assert!(out.equals(&expected));
    }

    #[test]
    fn remove_duplicates_needs_every_column_equal() {
        let df = df!(
            "id" => ["a", "b", "a", "b", "a"],
            "val" => [Some(1i64), Some(1), Some(2), Some(1), None]
        )
        .unwrap();
        let out = DataProcessor::remove_duplicates(&df).unwrap();

        let expected = df!(
            "id" => ["a", "b", "a", "a"],
            "val" => [Some(1i64), Some(1), Some(2), None]
        )
        .unwrap();
        assert!(out.equals_missing(&expected));
    }

    #[test]
    fn remove_duplicates_treats_missing_as_equal() {
        let df = df!("x" => [None, Some(1i64), None]).unwrap();
        let out = DataProcessor::remove_duplicates(&df).unwrap();
        assert_eq!(out.height(), 2);
    }

    #[test]
    fn fill_missing_uses_column_mean() {
        let df = df!("score" => [Some(10i64), None, Some(30)]).unwrap();
        let (out, report) = DataProcessor::fill_missing(&df).unwrap();

        let score: Vec<Option<f64>> = out
            .column("score")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(score, vec![Some(10.0), Some(20.0), Some(30.0)]);
        assert_eq!(report.filled, vec![("score".to_string(), 20.0)]);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn fill_missing_leaves_text_and_complete_columns_alone() {
        let df = df!(
            "name" => [Some("x"), None, Some("z")],
            "complete" => [1i64, 2, 3],
            "ratio" => [Some(0.5f64), Some(1.5), None]
        )
        .unwrap();
        let (out, report) = DataProcessor::fill_missing(&df).unwrap();

        assert_eq!(out.column("name").unwrap().null_count(), 1);
        assert_eq!(out.column("complete").unwrap().dtype(), &DataType::Int64);
        assert!(out
            .column("complete")
            .unwrap()
            .as_materialized_series()
            .equals(df.column("complete").unwrap().as_materialized_series()));

        let ratio: Vec<Option<f64>> = out
            .column("ratio")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(ratio, vec![Some(0.5), Some(1.5), Some(1.0)]);
        assert_eq!(report.filled.len(), 1);
    }

    #[test]
    fn fill_missing_skips_entirely_missing_column() {
        let df = df!(
            "empty" => [None::<f64>, None],
            "val" => [Some(2i64), None]
        )
        .unwrap();
        let (out, report) = DataProcessor::fill_missing(&df).unwrap();

        assert_eq!(out.column("empty").unwrap().null_count(), 2);
        assert_eq!(report.skipped, vec!["empty".to_string()]);
        assert_eq!(out.column("val").unwrap().null_count(), 0);
        assert!(report.summary().contains("left empty"));
    }

    #[test]
    fn fill_missing_treats_nan_as_missing() {
        let df = df!("v" => [Some(1.0f64), Some(f64::NAN), None, Some(3.0)]).unwrap();
        let (out, report) = DataProcessor::fill_missing(&df).unwrap();

        let v: Vec<Option<f64>> = out
            .column("v")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(v, vec![Some(1.0), Some(2.0), Some(2.0), Some(3.0)]);
        assert_eq!(report.filled, vec![("v".to_string(), 2.0)]);
    }

    #[test]
    fn fill_mean_ignores_infinite_values() {
        let df = df!("v" => [Some(2.0f64), Some(f64::INFINITY), None, Some(4.0)]).unwrap();
        let (_, report) = DataProcessor::fill_missing(&df).unwrap();
        assert_eq!(report.filled, vec![("v".to_string(), 3.0)]);

        let extremes = df!("v" => [Some(-1e308f64), Some(1e308), None]).unwrap();
        let (_, report) = DataProcessor::fill_missing(&extremes).unwrap();
        assert!(report.filled[0].1.is_finite());
    }

    #[test]
    fn select_columns_keeps_original_order() {
        let df = df!("a" => [1i64], "b" => [2i64], "c" => [3i64]).unwrap();
        let out =
            DataProcessor::select_columns(&df, &["c".to_string(), "a".to_string()]).unwrap();
        assert_eq!(names(&out), vec!["a", "c"]);
    }

    #[test]
    fn select_columns_rejects_unknown_names() {
        let df = df!("a" => [1i64]).unwrap();
        let err = DataProcessor::select_columns(&df, &["zzz".to_string()]).unwrap_err();
        assert!(matches!(err, ProcessorError::ColumnNotFound(ref c) if c == "zzz"));
    }

    #[test]
    fn select_nothing_gives_empty_table() {
        let df = df!("a" => [1i64], "b" => [2i64]).unwrap();
        let out = DataProcessor::select_columns(&df, &[]).unwrap();
        assert_eq!(out.width(), 0);
    }
}

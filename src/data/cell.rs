//! Cell helpers shared by the preview grid, charts and writers.

use polars::prelude::*;

/// Whether a column of this type supports an arithmetic mean.
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Float32
            | DataType::Float64
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
    )
}

/// Display text of a cell; strings come back without the quotes polars adds.
pub fn cell_text(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => "null".to_string(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => other.to_string().trim_matches('"').to_string(),
    }
}

/// Numeric value of a cell, if it has one.
pub fn cell_f64(value: &AnyValue) -> Option<f64> {
    match value {
        AnyValue::Null | AnyValue::Boolean(_) => None,
        AnyValue::String(_) | AnyValue::StringOwned(_) => None,
        other => other.extract::<f64>(),
    }
}

//! Chart Model
//! Turns a table and the user's axis choices into plot-ready data.

use crate::data::cell::{cell_f64, cell_text, is_numeric_dtype};
use crate::data::numeric_columns;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    #[error("Column '{0}' not found. Please reselect the columns.")]
    MissingColumn(String),
    #[error("Column '{0}' is not numeric")]
    NotNumeric(String),
    #[error("No x-axis column selected")]
    NoXAxis,
    #[error("No numeric columns available for visualization.")]
    NoNumericColumns,
    #[error("Polars error: {0}")]
    Polars(String),
}

impl From<PolarsError> for ChartError {
    fn from(e: PolarsError) -> Self {
        ChartError::Polars(e.to_string())
    }
}

/// Chart kinds offered in the chart selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
    Histogram,
}

impl ChartKind {
    pub const ALL: [ChartKind; 3] = [ChartKind::Line, ChartKind::Bar, ChartKind::Histogram];

    pub fn label(&self) -> &'static str {
        match self {
            ChartKind::Line => "Line Chart",
            ChartKind::Bar => "Bar Chart",
            ChartKind::Histogram => "Histogram",
        }
    }

    /// Histograms only look at the y-axis column.
    pub fn uses_x_axis(&self) -> bool {
        !matches!(self, ChartKind::Histogram)
    }
}

/// What the user asked to plot.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub kind: ChartKind,
    pub x_axis: Option<String>,
    pub y_axis: String,
}

/// One histogram bar.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

impl HistogramBin {
    pub fn center(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }
}

/// Plot-ready data for one chart.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartData {
    /// Line or bar chart of y against x
    Series {
        kind: ChartKind,
        x_label: String,
        y_label: String,
        points: Vec<[f64; 2]>,
        /// Tick labels when x is categorical; points sit at 0, 1, 2, ...
        categories: Option<Vec<String>>,
    },
    Histogram {
        column: String,
        bins: Vec<HistogramBin>,
    },
}

impl ChartData {
    pub fn title(&self) -> String {
        match self {
            ChartData::Series {
                kind,
                x_label,
                y_label,
                ..
            } => format!("{}: {} by {}", kind.label(), y_label, x_label),
            ChartData::Histogram { column, .. } => format!("Histogram: {}", column),
        }
    }
}

/// Resolve the request against the table. Columns are looked up by name at
/// call time, so a stale selection surfaces as `MissingColumn`.
pub fn prepare_chart(
    df: &DataFrame,
    request: &ChartRequest,
    histogram_bins: usize,
) -> Result<ChartData, ChartError> {
    if numeric_columns(df).is_empty() {
        return Err(ChartError::NoNumericColumns);
    }

    let y_column = df
        .column(&request.y_axis)
        .map_err(|_| ChartError::MissingColumn(request.y_axis.clone()))?;
    if !is_numeric_dtype(y_column.dtype()) {
        return Err(ChartError::NotNumeric(request.y_axis.clone()));
    }
    let y_values = numeric_values(y_column)?;

    if request.kind == ChartKind::Histogram {
        let present: Vec<f64> = y_values.iter().flatten().copied().collect();
        return Ok(ChartData::Histogram {
            column: request.y_axis.clone(),
            bins: histogram(&present, histogram_bins),
        });
    }

    let x_name = request.x_axis.as_ref().ok_or(ChartError::NoXAxis)?;
    let x_column = df
        .column(x_name)
        .map_err(|_| ChartError::MissingColumn(x_name.clone()))?;

    let numeric_x = request.kind == ChartKind::Line && is_numeric_dtype(x_column.dtype());
    let (points, categories) = if numeric_x {
        let x_values = numeric_values(x_column)?;
        let points = x_values
            .iter()
            .zip(y_values.iter())
            .filter_map(|(x, y)| Some([(*x)?, (*y)?]))
            .collect();
        (points, None)
    } else {
        let mut points = Vec::new();
        let mut labels = Vec::new();
        for (row, y) in y_values.iter().enumerate() {
            let Some(y) = y else { continue };
            points.push([labels.len() as f64, *y]);
            labels.push(cell_text(&x_column.get(row)?));
        }
        (points, Some(labels))
    };

    Ok(ChartData::Series {
        kind: request.kind,
        x_label: x_name.clone(),
        y_label: request.y_axis.clone(),
        points,
        categories,
    })
}

fn numeric_values(column: &Column) -> Result<Vec<Option<f64>>, ChartError> {
    (0..column.len())
        .map(|i| -> Result<Option<f64>, ChartError> {
            Ok(cell_f64(&column.get(i)?).filter(|v| v.is_finite()))
        })
        .collect()
}

/// Equal-width bins over [min, max]; the maximum lands in the last bin.
/// A constant column gets the range [v - 0.5, v + 0.5]. Non-finite values
/// are not counted.
pub fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    let bins = bins.max(1);
    let values: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return Vec::new();
    }

    let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    // Divide before subtracting so [-MAX, MAX] stays finite
    let n = bins as f64;
    let width = hi / n - lo / n;

    let mut counts = vec![0usize; bins];
    for &v in &values {
        let idx = ((v / width - lo / width).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: lo + i as f64 * width,
            end: if i + 1 == bins {
                hi
            } else {
                lo + (i + 1) as f64 * width
            },
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> DataFrame {
        df!(
            "name" => ["a", "b", "c"],
            "x" => [1.0f64, 2.0, 3.0],
            "score" => [Some(10i64), None, Some(30)]
        )
        .unwrap()
    }

    fn request(kind: ChartKind, x: Option<&str>, y: &str) -> ChartRequest {
        ChartRequest {
            kind,
            x_axis: x.map(String::from),
            y_axis: y.to_string(),
        }
    }

    #[test]
    fn line_with_numeric_x_skips_missing_y() {
        let chart = prepare_chart(&table(), &request(ChartKind::Line, Some("x"), "score"), 10)
            .unwrap();
        match chart {
            ChartData::Series {
                points, categories, ..
            } => {
                assert_eq!(points, vec![[1.0, 10.0], [3.0, 30.0]]);
                assert!(categories.is_none());
            }
            other => panic!("unexpected chart {:?}", other),
        }
    }

    #[test]
    fn bar_uses_category_positions() {
        let chart =
            prepare_chart(&table(), &request(ChartKind::Bar, Some("name"), "score"), 10).unwrap();
        match chart {
            ChartData::Series {
                points, categories, ..
            } => {
                assert_eq!(points, vec![[0.0, 10.0], [1.0, 30.0]]);
                assert_eq!(categories, Some(vec!["a".to_string(), "c".to_string()]));
            }
            other => panic!("unexpected chart {:?}", other),
        }
    }

    #[test]
    fn stale_x_axis_is_a_named_error() {
        let err = prepare_chart(&table(), &request(ChartKind::Line, Some("gone"), "score"), 10)
            .unwrap_err();
        assert_eq!(err, ChartError::MissingColumn("gone".into()));
        assert!(err.to_string().contains("'gone'"));
    }

    #[test]
    fn histogram_ignores_x_axis() {
        let chart = prepare_chart(
            &table(),
            &request(ChartKind::Histogram, Some("removed_column"), "score"),
            2,
        )
        .unwrap();
        assert_eq!(
            chart,
            ChartData::Histogram {
                column: "score".into(),
                bins: vec![
                    HistogramBin { start: 10.0, end: 20.0, count: 1 },
                    HistogramBin { start: 20.0, end: 30.0, count: 1 },
                ],
            }
        );
    }

    #[test]
    fn y_axis_must_be_numeric() {
        let err = prepare_chart(&table(), &request(ChartKind::Bar, Some("x"), "name"), 10)
            .unwrap_err();
        assert_eq!(err, ChartError::NotNumeric("name".into()));
    }

    #[test]
    fn table_without_numbers_is_rejected() {
        let df = df!("name" => ["a", "b"]).unwrap();
        let err = prepare_chart(&df, &request(ChartKind::Histogram, None, "name"), 10)
            .unwrap_err();
        assert_eq!(err, ChartError::NoNumericColumns);
    }

    #[test]
    fn line_is_the_default_kind() {
        assert_eq!(ChartKind::default(), ChartKind::Line);
        assert!(!ChartKind::Histogram.uses_x_axis());
    }

    #[test]
    fn histogram_bins_cover_max_value() {
        let bins = histogram(&[1.0, 2.0, 3.0, 4.0], 2);
        let counts: Vec<usize> = bins.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 2]);
        assert_eq!(bins[0].start, 1.0);
        assert_eq!(bins[1].end, 4.0);
    }

    #[test]
    fn constant_histogram_gets_unit_range() {
        let bins = histogram(&[5.0, 5.0], 10);
        assert_eq!(bins.len(), 10);
        assert_eq!(bins.first().unwrap().start, 4.5);
        assert_eq!(bins.last().unwrap().end, 5.5);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
    }

    #[test]
    fn empty_histogram_has_no_bins() {
        assert!(histogram(&[], 10).is_empty());
    }

    #[test]
    fn infinite_values_are_left_out_of_charts() {
        let df = df!(
            "x" => [1.0f64, 2.0, 3.0],
            "v" => [1.0f64, f64::INFINITY, 3.0]
        )
        .unwrap();

        let chart = prepare_chart(&df, &request(ChartKind::Histogram, None, "v"), 2).unwrap();
        match chart {
            ChartData::Histogram { bins, .. } => {
                assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
                assert_eq!(bins[0].start, 1.0);
                assert_eq!(bins[1].end, 3.0);
            }
            other => panic!("unexpected chart {:?}", other),
        }

        let chart = prepare_chart(&df, &request(ChartKind::Line, Some("x"), "v"), 2).unwrap();
        match chart {
            ChartData::Series { points, .. } => {
                assert_eq!(points, vec![[1.0, 1.0], [3.0, 3.0]]);
            }
            other => panic!("unexpected chart {:?}", other),
        }
    }

    #[test]
    fn extreme_range_gives_finite_bins() {
        let bins = histogram(&[-1e308, 1e308, f64::NEG_INFINITY], 10);
        assert_eq!(bins.len(), 10);
        assert!(bins.iter().all(|b| b.start.is_finite() && b.end.is_finite()));
        assert_eq!(bins.first().unwrap().count, 1);
        assert_eq!(bins.last().unwrap().count, 1);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
    }
}

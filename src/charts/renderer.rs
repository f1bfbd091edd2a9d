//! Static Chart Renderer
//! Renders prepared chart data to PNG bytes with plotters.
//!
//! Layout: caption on top, y labels on the left, x labels below. Line charts
//! with a numeric x use a linear axis; categorical x is drawn at positions
//! 0..n with the category text as tick labels.

use crate::charts::{ChartData, ChartKind};
use image::{ImageFormat, RgbImage};
use plotters::prelude::*;
use std::io::Cursor;
use thiserror::Error;

const SERIES: RGBColor = RGBColor(52, 152, 219);
const HISTOGRAM: RGBColor = RGBColor(46, 204, 113);

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Chart drawing failed: {0}")]
    Draw(String),
    #[error("Image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("Nothing to draw")]
    Empty,
    #[error("Values span too wide a range to draw")]
    Range,
    #[error("Image size {0}x{1} is too large")]
    Size(u32, u32),
}

fn draw_err<E: std::fmt::Display>(e: E) -> RenderError {
    RenderError::Draw(e.to_string())
}

pub struct ChartRenderer;

impl ChartRenderer {
    /// Render to an in-memory PNG.
    pub fn render_png(chart: &ChartData, width: u32, height: u32) -> Result<Vec<u8>, RenderError> {
        let len = (width as usize)
            .checked_mul(height as usize)
            .and_then(|n| n.checked_mul(3))
            .ok_or(RenderError::Size(width, height))?;
        let mut pixels = vec![0u8; len];
        {
            let root = BitMapBackend::with_buffer(&mut pixels, (width, height)).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;

            match chart {
                ChartData::Series {
                    kind,
                    x_label,
                    y_label,
                    points,
                    categories,
                } => {
                    if points.is_empty() {
                        return Err(RenderError::Empty);
                    }
                    let (x_min, x_max) = padded_range(points.iter().map(|p| p[0]), 0.5);
                    let (y_min, y_max) = value_range(points.iter().map(|p| p[1]));
                    check_span(x_min, x_max)?;
                    check_span(y_min, y_max)?;

                    let mut ctx = ChartBuilder::on(&root)
                        .caption(chart.title(), ("sans-serif", 24))
                        .margin(20)
                        .x_label_area_size(50)
                        .y_label_area_size(60)
                        .build_cartesian_2d(x_min..x_max, y_min..y_max)
                        .map_err(draw_err)?;

                    let labels = categories.clone().unwrap_or_default();
                    let format_x = |v: &f64| -> String {
                        if categories.is_none() {
                            return format!("{}", v);
                        }
                        if v.fract().abs() > f64::EPSILON || *v < 0.0 {
                            return String::new();
                        }
                        labels.get(*v as usize).cloned().unwrap_or_default()
                    };

                    ctx.configure_mesh()
                        .x_desc(x_label.as_str())
                        .y_desc(y_label.as_str())
                        .x_label_formatter(&format_x)
                        .draw()
                        .map_err(draw_err)?;

                    match kind {
                        ChartKind::Bar => {
                            ctx.draw_series(points.iter().map(|p| {
                                Rectangle::new(
                                    [(p[0] - 0.3, 0.0f64.max(y_min)), (p[0] + 0.3, p[1])],
                                    SERIES.mix(0.8).filled(),
                                )
                            }))
                            .map_err(draw_err)?;
                        }
                        _ => {
                            ctx.draw_series(LineSeries::new(
                                points.iter().map(|p| (p[0], p[1])),
                                SERIES.stroke_width(2),
                            ))
                            .map_err(draw_err)?;
                        }
                    }
                }
                ChartData::Histogram { column, bins } => {
                    let (Some(first), Some(last)) = (bins.first(), bins.last()) else {
                        return Err(RenderError::Empty);
                    };
                    let max_count = bins.iter().map(|b| b.count).max().unwrap_or(0) as f64;
                    check_span(first.start, last.end)?;

                    let mut ctx = ChartBuilder::on(&root)
                        .caption(chart.title(), ("sans-serif", 24))
                        .margin(20)
                        .x_label_area_size(50)
                        .y_label_area_size(60)
                        .build_cartesian_2d(first.start..last.end, 0f64..(max_count * 1.1).max(1.0))
                        .map_err(draw_err)?;

                    ctx.configure_mesh()
                        .x_desc(column.as_str())
                        .y_desc("Frequency")
                        .draw()
                        .map_err(draw_err)?;

                    ctx.draw_series(bins.iter().map(|b| {
                        Rectangle::new(
                            [(b.start, 0.0), (b.end, b.count as f64)],
                            HISTOGRAM.mix(0.8).filled(),
                        )
                    }))
                    .map_err(draw_err)?;
                }
            }

            root.present().map_err(draw_err)?;
        }

        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| RenderError::Draw("pixel buffer size mismatch".to_string()))?;
        let mut png = Cursor::new(Vec::new());
        image.write_to(&mut png, ImageFormat::Png)?;

        log::info!("Rendered {} ({}x{})", chart.title(), width, height);
        Ok(png.into_inner())
    }
}

/// plotters cannot lay out an axis whose length is not finite.
fn check_span(min: f64, max: f64) -> Result<(), RenderError> {
    if (max - min).is_finite() {
        Ok(())
    } else {
        Err(RenderError::Range)
    }
}

fn padded_range(values: impl Iterator<Item = f64>, pad: f64) -> (f64, f64) {
    let (min, max) = min_max(values);
    (min - pad, max + pad)
}

/// Y range with 10% headroom, always including zero for bars.
fn value_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = min_max(values);
    let (min, max) = (min.min(0.0), max.max(0.0));
    let pad = ((max - min) * 0.1).max(0.5);
    (min - if min < 0.0 { pad } else { 0.0 }, max + pad)
}

fn min_max(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if min.is_infinite() {
        (0.0, 1.0)
    } else {
        (min, max)
    }
}

//! Chart Plotter Module
//! Creates interactive visualizations using egui_plot.

use crate::charts::{ChartData, ChartKind};
use egui::Color32;
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints, Points};

/// Series color
pub const SERIES_COLOR: Color32 = Color32::from_rgb(52, 152, 219); // Blue
pub const HISTOGRAM_COLOR: Color32 = Color32::from_rgb(46, 204, 113); // Green

const PLOT_HEIGHT: f32 = 320.0;

/// Draws prepared chart data with egui_plot.
pub struct ChartPlotter;

impl ChartPlotter {
    /// Draw a chart under a per-file plot id.
    pub fn draw(ui: &mut egui::Ui, plot_id: &str, chart: &ChartData) {
        match chart {
            ChartData::Series {
                kind,
                x_label,
                y_label,
                points,
                categories,
            } => Self::draw_series(
                ui,
                plot_id,
                *kind,
                x_label,
                y_label,
                points,
                categories.as_deref(),
            ),
            ChartData::Histogram { column, bins } => {
                let bars: Vec<Bar> = bins
                    .iter()
                    .map(|b| {
                        Bar::new(b.center(), b.count as f64)
                            .width(b.width())
                            .name(format!("{:.3} - {:.3}", b.start, b.end))
                    })
                    .collect();

                Plot::new(format!("hist_{}", plot_id))
                    .height(PLOT_HEIGHT)
                    .x_axis_label(column.as_str())
                    .y_axis_label("Frequency")
                    .allow_scroll(false)
                    .legend(Legend::default())
                    .show(ui, |plot_ui| {
                        plot_ui.bar_chart(
                            BarChart::new(bars)
                                .color(HISTOGRAM_COLOR)
                                .name(column.as_str()),
                        );
                    });
            }
        }
    }

    fn draw_series(
        ui: &mut egui::Ui,
        plot_id: &str,
        kind: ChartKind,
        x_label: &str,
        y_label: &str,
        points: &[[f64; 2]],
        categories: Option<&[String]>,
    ) {
        let mut plot = Plot::new(format!("series_{}", plot_id))
            .height(PLOT_HEIGHT)
            .x_axis_label(x_label)
            .y_axis_label(y_label)
            .allow_scroll(false)
            .legend(Legend::default());

        // Category ticks only at integer positions
        if let Some(labels) = categories {
            let labels: Vec<String> = labels.to_vec();
            plot = plot.x_axis_formatter(move |mark, _range| {
                let v = mark.value;
                if v.fract().abs() > f64::EPSILON || v < 0.0 {
                    return String::new();
                }
                labels.get(v as usize).cloned().unwrap_or_default()
            });
        }

        let y_name = y_label.to_string();
        plot.show(ui, |plot_ui| match kind {
            ChartKind::Bar => {
                let bars: Vec<Bar> = points
                    .iter()
                    .map(|p| Bar::new(p[0], p[1]).width(0.6))
                    .collect();
                plot_ui.bar_chart(BarChart::new(bars).color(SERIES_COLOR).name(&y_name));
            }
            _ => {
                let series: PlotPoints = points.iter().copied().collect();
                plot_ui.line(
                    Line::new(series)
                        .color(SERIES_COLOR)
                        .width(1.5)
                        .name(&y_name),
                );
                // Single points would be invisible as a line
                if points.len() < 2 {
                    let markers: PlotPoints = points.iter().copied().collect();
                    plot_ui.points(Points::new(markers).radius(3.0).color(SERIES_COLOR));
                }
            }
        });
    }
}

//! Chart Viewer Widget
//! Card showing the last generated chart of a file.

use crate::charts::{ChartData, ChartPlotter};
use egui::{Color32, RichText};

const CARD_BORDER: Color32 = Color32::from_rgb(100, 149, 237);

pub struct ChartViewer;

impl ChartViewer {
    /// Draw the chart card. Returns true when "Save as PNG" was clicked.
    pub fn show(ui: &mut egui::Ui, plot_id: &str, chart: &ChartData) -> bool {
        let mut save_clicked = false;

        ui.add_space(8.0);
        egui::Frame::none()
            .rounding(8.0)
            .stroke(egui::Stroke::new(2.0, CARD_BORDER))
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .inner_margin(12.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.label(
                        RichText::new(chart.title())
                            .size(16.0)
                            .strong()
                            .color(CARD_BORDER),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("💾 Save as PNG").clicked() {
                            save_clicked = true;
                        }
                    });
                });
                ui.add_space(6.0);
                ChartPlotter::draw(ui, plot_id, chart);
            });

        save_clicked
    }
}

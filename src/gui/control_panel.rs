//! Control Panel Widget
//! Per-file card with details, preview, cleaning, chart and conversion controls.

use crate::charts::ChartKind;
use crate::data::cell::{cell_text, is_numeric_dtype};
use crate::data::FileFormat;
use crate::session::{FileEntry, FileSettings, Notice, NoticeLevel};
use egui::{Color32, ComboBox, RichText};

const SUCCESS_COLOR: Color32 = Color32::from_rgb(40, 167, 69);
const ERROR_COLOR: Color32 = Color32::from_rgb(220, 53, 69);
const WARNING_COLOR: Color32 = Color32::from_rgb(230, 162, 60);

/// Actions triggered from a file's control panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPanelAction {
    None,
    RemoveDuplicates,
    FillMissing,
    Reset,
    GenerateChart,
    SaveChartImage,
    Convert,
    Remove,
}

/// Draws the controls for one uploaded file.
pub struct ControlPanel;

impl ControlPanel {
    pub fn show(
        ui: &mut egui::Ui,
        entry: &FileEntry,
        settings: &mut FileSettings,
        preview_rows: usize,
    ) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;
        let name = entry.file.name.as_str();

        // ===== File Details =====
        ui.horizontal(|ui| {
            ui.label(RichText::new(format!("📄 {}", name)).size(16.0).strong());
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.small_button("✖ Remove").clicked() {
                    action = ControlPanelAction::Remove;
                }
                if ui.small_button("↺ Reset").clicked() {
                    action = ControlPanelAction::Reset;
                }
            });
        });
        ui.label(format!("File Size: {:.2} KB", entry.file.size_kb()));
        ui.label(format!(
            "{} rows × {} columns ({})",
            entry.table.height(),
            entry.table.width(),
            entry.format.label()
        ));

        ui.add_space(5.0);
        ui.label(RichText::new("Preview the head of the table").color(Color32::GRAY));
        Self::draw_preview(ui, entry, preview_rows);

        ui.add_space(10.0);
        ui.separator();

        // ===== Data Cleaning =====
        ui.label(RichText::new("🧹 Data Cleaning Options").size(14.0).strong());
        ui.checkbox(&mut settings.clean_enabled, format!("Clean Data for {}", name));

        if settings.clean_enabled {
            ui.horizontal(|ui| {
                if ui
                    .button(format!("Remove Duplicates from {}", name))
                    .clicked()
                {
                    action = ControlPanelAction::RemoveDuplicates;
                }
                if ui
                    .button(format!("Fill Missing Values for {}", name))
                    .clicked()
                {
                    action = ControlPanelAction::FillMissing;
                }
            });

            ui.add_space(5.0);
            ui.label(RichText::new("🛠️ Select Columns to Convert").strong());
            Self::draw_column_selector(ui, entry, settings);
        }

        ui.add_space(10.0);
        ui.separator();

        // ===== Data Visualization =====
        ui.label(RichText::new("📊 Data Visualization").size(14.0).strong());
        let (view_columns, view_numeric) = Self::view_columns(entry, settings);

        if view_columns.is_empty() {
            ui.label(RichText::new("No columns selected.").color(Color32::GRAY));
        } else {
            let label_width = 110.0;
            let combo_width = 180.0;

            ui.horizontal(|ui| {
                ui.add_sized([label_width, 20.0], egui::Label::new("Chart Type:"));
                ComboBox::from_id_salt("chart_kind")
                    .width(combo_width)
                    .selected_text(settings.chart_kind.label())
                    .show_ui(ui, |ui| {
                        for kind in ChartKind::ALL {
                            ui.selectable_value(&mut settings.chart_kind, kind, kind.label());
                        }
                    });
            });

            ui.add_enabled_ui(settings.chart_kind.uses_x_axis(), |ui| {
                ui.horizontal(|ui| {
                    ui.add_sized([label_width, 20.0], egui::Label::new("X-axis:"));
                    Self::column_combo(ui, "x_axis", combo_width, &mut settings.x_axis, &view_columns);
                });
            });

            if view_numeric.is_empty() {
                ui.label(
                    RichText::new("⚠️ No numeric columns available for visualization.")
                        .color(WARNING_COLOR),
                );
            } else {
                ui.horizontal(|ui| {
                    ui.add_sized([label_width, 20.0], egui::Label::new("Y-axis:"));
                    Self::column_combo(ui, "y_axis", combo_width, &mut settings.y_axis, &view_numeric);
                });

                ui.horizontal(|ui| {
                    if ui.button(format!("Generate Chart for {}", name)).clicked() {
                        action = ControlPanelAction::GenerateChart;
                    }
                });
            }
        }

        if let Some(chart) = &entry.chart {
            if super::ChartViewer::show(ui, name, chart) {
                action = ControlPanelAction::SaveChartImage;
            }
        }

        ui.add_space(10.0);
        ui.separator();

        // ===== Conversion =====
        ui.label(RichText::new("🔄 Conversion Options").size(14.0).strong());
        ui.horizontal(|ui| {
            ui.label(format!("Convert {}:", name));
            for format in FileFormat::ALL {
                ui.radio_value(&mut settings.export_format, format, format.label());
            }
        });
        if ui.button(format!("Convert {}", name)).clicked() {
            action = ControlPanelAction::Convert;
        }

        Self::draw_notices(ui, &entry.notices);

        action
    }

    /// Columns later steps will see, and the numeric subset of them.
    fn view_columns(entry: &FileEntry, settings: &FileSettings) -> (Vec<String>, Vec<String>) {
        let mut all = Vec::new();
        let mut numeric = Vec::new();
        for column in entry.table.get_columns() {
            let name = column.name().to_string();
            if settings.clean_enabled && !settings.selected_columns.contains(&name) {
                continue;
            }
            if is_numeric_dtype(column.dtype()) {
                numeric.push(name.clone());
            }
            all.push(name);
        }
        (all, numeric)
    }

    fn column_combo(
        ui: &mut egui::Ui,
        id: &str,
        width: f32,
        selected: &mut Option<String>,
        options: &[String],
    ) {
        // A stale choice stays visible until the user reselects
        let text = selected.clone().unwrap_or_default();
        ComboBox::from_id_salt(id)
            .width(width)
            .selected_text(text)
            .show_ui(ui, |ui| {
                for option in options {
                    let is_selected = selected.as_deref() == Some(option.as_str());
                    if ui.selectable_label(is_selected, option).clicked() {
                        *selected = Some(option.clone());
                    }
                }
            });
    }

    fn draw_column_selector(ui: &mut egui::Ui, entry: &FileEntry, settings: &mut FileSettings) {
        let columns: Vec<String> = entry
            .table
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .collect();

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(5.0)
            .show(ui, |ui| {
                ui.horizontal_wrapped(|ui| {
                    for column in &columns {
                        let mut checked = settings.selected_columns.contains(column);
                        if ui.checkbox(&mut checked, column.as_str()).changed() {
                            if checked {
                                settings.selected_columns.push(column.clone());
                            } else {
                                settings.selected_columns.retain(|c| c != column);
                            }
                        }
                    }
                });
            });

        ui.horizontal(|ui| {
            if ui.small_button("Select All").clicked() {
                settings.selected_columns = columns.clone();
            }
            if ui.small_button("Clear All").clicked() {
                settings.selected_columns.clear();
            }
        });
    }

    fn draw_preview(ui: &mut egui::Ui, entry: &FileEntry, rows: usize) {
        let head = entry.table.head(Some(rows));
        let columns = head.get_columns();

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                egui::ScrollArea::horizontal().show(ui, |ui| {
                    egui::Grid::new("preview")
                        .striped(true)
                        .min_col_width(55.0)
                        .spacing([12.0, 4.0])
                        .show(ui, |ui| {
                            for column in columns {
                                ui.label(RichText::new(column.name().as_str()).strong().size(11.0));
                            }
                            ui.end_row();

                            for row in 0..head.height() {
                                for column in columns {
                                    let text = column
                                        .get(row)
                                        .map(|v| cell_text(&v))
                                        .unwrap_or_default();
                                    ui.label(RichText::new(text).size(11.0));
                                }
                                ui.end_row();
                            }
                        });
                });
            });
    }

    fn draw_notices(ui: &mut egui::Ui, notices: &[Notice]) {
        if notices.is_empty() {
            return;
        }
        ui.add_space(5.0);
        for notice in notices {
            notice_label(ui, notice);
        }
    }
}

/// Colored one-line notice.
pub fn notice_label(ui: &mut egui::Ui, notice: &Notice) {
    let (icon, color) = match notice.level {
        NoticeLevel::Success => ("✔", SUCCESS_COLOR),
        NoticeLevel::Info => ("ℹ", Color32::GRAY),
        NoticeLevel::Warning => ("⚠", WARNING_COLOR),
        NoticeLevel::Error => ("✖", ERROR_COLOR),
    };
    ui.label(
        RichText::new(format!("{} {}", icon, notice.text))
            .size(12.0)
            .color(color),
    );
}

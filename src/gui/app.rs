//! Data Sweeper Main Application
//! Upload bar on top, one control card per uploaded file below.

use crate::charts::ChartRenderer;
use crate::config::SweeperConfig;
use crate::data::UploadedFile;
use crate::export::Download;
use crate::gui::{notice_label, ControlPanel, ControlPanelAction};
use crate::session::{FileKey, NoticeLevel, Session};
use anyhow::{Context, Result};
use egui::{Color32, RichText, TopBottomPanel};
use std::path::Path;

/// Main application window.
pub struct DataSweeperApp {
    session: Session,
    status: String,
}

impl DataSweeperApp {
    pub fn new(_cc: &eframe::CreationContext<'_>, config: SweeperConfig) -> Self {
        Self {
            session: Session::new(config),
            status: "Upload CSV or Excel files to begin".to_string(),
        }
    }

    /// Handle file selection from the upload button
    fn handle_browse(&mut self) {
        let Some(paths) = rfd::FileDialog::new()
            .add_filter("CSV or Excel", &["csv", "xlsx"])
            .pick_files()
        else {
            return;
        };

        let files = paths
            .iter()
            .filter_map(|path| match Self::read_upload(path) {
                Ok(file) => Some(file),
                Err(e) => {
                    log::error!("{:#}", e);
                    self.status = format!("Error: {:#}", e);
                    None
                }
            })
            .collect();
        self.ingest(files);
    }

    /// Files dropped onto the window are treated as uploads
    fn handle_dropped_files(&mut self, ctx: &egui::Context) {
        let dropped = ctx.input(|i| i.raw.dropped_files.clone());
        if dropped.is_empty() {
            return;
        }

        let mut files = Vec::new();
        for file in dropped {
            if let Some(bytes) = file.bytes {
                files.push(UploadedFile::new(file.name, bytes.to_vec()));
            } else if let Some(path) = file.path {
                match Self::read_upload(&path) {
                    Ok(upload) => files.push(upload),
                    Err(e) => log::error!("{:#}", e),
                }
            }
        }
        self.ingest(files);
    }

    fn read_upload(path: &Path) -> Result<UploadedFile> {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(UploadedFile::new(name, bytes))
    }

    fn ingest(&mut self, files: Vec<UploadedFile>) {
        if files.is_empty() {
            return;
        }
        self.session.clear_rejected();
        let summary = self.session.ingest(files);
        self.status = format!(
            "Loaded {} file(s), {} skipped",
            summary.loaded.len(),
            summary.failed.len()
        );
    }

    fn handle_action(&mut self, key: &FileKey, action: ControlPanelAction) {
        let outcome = match action {
            ControlPanelAction::None => Ok(()),
            ControlPanelAction::RemoveDuplicates => {
                self.session.remove_duplicates(key).map(|_| ())
            }
            ControlPanelAction::FillMissing => self.session.fill_missing(key).map(|_| ()),
            ControlPanelAction::Reset => self.session.reset(key),
            // Failures are already recorded on the file
            ControlPanelAction::GenerateChart => {
                let _ = self.session.generate_chart(key);
                Ok(())
            }
            ControlPanelAction::SaveChartImage => {
                self.handle_save_chart(key);
                Ok(())
            }
            ControlPanelAction::Convert => match self.session.export(key) {
                Ok(download) => {
                    self.handle_download(key, &download);
                    Ok(())
                }
                Err(e) => Err(e),
            },
            ControlPanelAction::Remove => {
                self.session.remove(key);
                Ok(())
            }
        };

        if let Err(e) = outcome {
            log::error!("{}: {}", key, e);
            let _ = self
                .session
                .notify(key, NoticeLevel::Error, format!("Error: {}", e));
        }
    }

    /// Offer the converted bytes through a save dialog
    fn handle_download(&mut self, key: &str, download: &Download) {
        let extension = Path::new(&download.file_name)
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();

        let Some(path) = rfd::FileDialog::new()
            .add_filter(download.mime_type, &[extension.as_str()])
            .set_file_name(&download.file_name)
            .save_file()
        else {
            return; // User cancelled
        };

        let (level, text) = match Self::write_file(&path, &download.bytes) {
            Ok(()) => (
                NoticeLevel::Success,
                format!("Saved {} ({})", path.display(), download.mime_type),
            ),
            Err(e) => {
                log::error!("{:#}", e);
                (NoticeLevel::Error, format!("Error: {:#}", e))
            }
        };
        let _ = self.session.notify(key, level, text);
    }

    fn handle_save_chart(&mut self, key: &str) {
        let Ok(entry) = self.session.entry(key) else {
            return;
        };
        let Some(chart) = &entry.chart else {
            return;
        };

        let config = self.session.config();
        let png = match ChartRenderer::render_png(chart, config.chart_width, config.chart_height)
        {
            Ok(png) => png,
            Err(e) => {
                let _ = self
                    .session
                    .notify(key, NoticeLevel::Error, format!("Render error: {}", e));
                return;
            }
        };

        let stem = key.rsplit_once('.').map(|(s, _)| s).unwrap_or(key);
        let Some(path) = rfd::FileDialog::new()
            .add_filter("PNG Image", &["png"])
            .set_file_name(format!("{}_chart.png", stem))
            .save_file()
        else {
            return;
        };

        let (level, text) = match Self::write_file(&path, &png) {
            Ok(()) => (NoticeLevel::Success, format!("Chart saved to {}", path.display())),
            Err(e) => (NoticeLevel::Error, format!("Error: {:#}", e)),
        };
        let _ = self.session.notify(key, level, text);
    }

    fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
        std::fs::write(path, bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        log::info!("Wrote {} bytes to {}", bytes.len(), path.display());
        Ok(())
    }
}

impl eframe::App for DataSweeperApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_dropped_files(ctx);

        // Header - title and upload
        TopBottomPanel::top("header").show(ctx, |ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("🧹 Data Cleaner")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(
                RichText::new(
                    "Transform your files between CSV and Excel formats with built-in data cleaning and visualization",
                )
                .size(12.0)
                .color(Color32::GRAY),
            );
            ui.add_space(5.0);
            ui.horizontal(|ui| {
                if ui.button("📂 Upload your files (CSV or Excel)").clicked() {
                    self.handle_browse();
                }
                ui.label(RichText::new("or drop them here").color(Color32::GRAY));
                ui.separator();
                ui.label(RichText::new(&self.status).size(11.0));
            });
            ui.add_space(5.0);
        });

        let preview_rows = self.session.config().preview_rows;
        let mut actions: Vec<(FileKey, ControlPanelAction)> = Vec::new();

        egui::CentralPanel::default().show(ctx, |ui| {
            egui::ScrollArea::vertical()
                .auto_shrink([false, false])
                .show(ui, |ui| {
                    for notice in self.session.rejected() {
                        notice_label(ui, notice);
                    }

                    let (entries, settings) = self.session.parts_mut();
                    for entry in entries {
                        let key = entry.key().to_string();
                        let Some(file_settings) = settings.get_mut(&key) else {
                            continue;
                        };

                        egui::Frame::none()
                            .fill(ui.visuals().faint_bg_color)
                            .rounding(8.0)
                            .inner_margin(12.0)
                            .show(ui, |ui| {
                                ui.push_id(&key, |ui| {
                                    let action =
                                        ControlPanel::show(ui, entry, file_settings, preview_rows);
                                    if action != ControlPanelAction::None {
                                        actions.push((key.clone(), action));
                                    }
                                });
                            });
                        ui.add_space(15.0);
                    }

                    if !entries.is_empty() {
                        ui.label(
                            RichText::new("✔ All files processed!")
                                .color(Color32::from_rgb(40, 167, 69)),
                        );
                    }
                });
        });

        for (key, action) in actions {
            self.handle_action(&key, action);
        }
    }
}

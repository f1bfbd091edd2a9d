//! Data Sweeper - CSV / Excel cleaning, charting and conversion
//!
//! Upload tabular files, tidy them up, plot a column and download the result
//! in either format.

mod charts;
mod config;
mod data;
mod export;
mod gui;
mod session;

use config::SweeperConfig;
use eframe::egui;
use gui::DataSweeperApp;

fn main() -> eframe::Result<()> {
    env_logger::init();

    let config = SweeperConfig::load();
    log::info!("Starting Data Sweeper with {:?}", config);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 850.0])
            .with_min_inner_size([900.0, 600.0])
            .with_title("Data Sweeper"),
        ..Default::default()
    };

    eframe::run_native(
        "Data Sweeper",
        options,
        Box::new(|cc| Ok(Box::new(DataSweeperApp::new(cc, config)))),
    )
}

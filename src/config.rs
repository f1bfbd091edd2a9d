//! Application Configuration
//! Optional `data_sweeper.json` in the working directory, defaults otherwise.

use crate::data::FileFormat;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE: &str = "data_sweeper.json";

/// Largest PNG side in pixels.
const MAX_CHART_SIDE: u32 = 8192;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// User-tunable settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SweeperConfig {
    /// Rows shown in the per-file preview grid
    pub preview_rows: usize,
    /// Number of equal-width histogram bins
    pub histogram_bins: usize,
    /// Rows scanned by the CSV reader to infer column types
    pub infer_schema_length: usize,
    /// PNG chart width in pixels
    pub chart_width: u32,
    /// PNG chart height in pixels
    pub chart_height: u32,
    /// Export format preselected for new uploads
    pub default_export_format: FileFormat,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            preview_rows: 5,
            histogram_bins: 10,
            infer_schema_length: 10000,
            chart_width: 1000,
            chart_height: 700,
            default_export_format: FileFormat::Csv,
        }
    }
}

impl SweeperConfig {
    /// Load `data_sweeper.json` if present. A broken file falls back to defaults.
    pub fn load() -> Self {
        let path = Path::new(CONFIG_FILE);
        if !path.exists() {
            return Self::default();
        }

        match Self::from_path(path) {
            Ok(config) => {
                log::info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Ignoring {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: SweeperConfig = serde_json::from_str(text)?;
        Ok(config.sanitized())
    }

    fn sanitized(mut self) -> Self {
        self.preview_rows = self.preview_rows.max(1);
        self.histogram_bins = self.histogram_bins.max(1);
        self.infer_schema_length = self.infer_schema_length.max(1);
        self.chart_width = self.chart_width.clamp(64, MAX_CHART_SIDE);
        self.chart_height = self.chart_height.clamp(64, MAX_CHART_SIDE);
        self
    }
}

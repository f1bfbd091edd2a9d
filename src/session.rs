//! Session State
//! Uploaded tables plus a per-file settings map keyed by file name.
//!
//! Every operation names the file it acts on, so choices made for one upload
//! never leak into another.

use crate::charts::{prepare_chart, ChartData, ChartError, ChartKind, ChartRequest};
use crate::config::SweeperConfig;
use crate::data::{
    column_names, numeric_columns, DataLoader, DataProcessor, FileFormat, FillReport,
    ProcessorError, UploadedFile,
};
use crate::export::{self, Download, ExportError};
use polars::prelude::*;
use std::collections::HashMap;
use thiserror::Error;

/// Identity of an uploaded file within a session.
pub type FileKey = String;

/// Maximum notices kept per file.
const MAX_NOTICES: usize = 5;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No uploaded file named '{0}'")]
    UnknownFile(String),
    #[error(transparent)]
    Processor(#[from] ProcessorError),
    #[error(transparent)]
    Chart(#[from] ChartError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A message shown next to a file (or at the top for rejected uploads).
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

/// An ingested file and its current table.
pub struct FileEntry {
    pub file: UploadedFile,
    pub format: FileFormat,
    original: DataFrame,
    pub table: DataFrame,
    pub chart: Option<ChartData>,
    pub notices: Vec<Notice>,
}

impl FileEntry {
    pub fn key(&self) -> &str {
        &self.file.name
    }

    fn notify(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.notices.push(Notice::new(level, text));
        if self.notices.len() > MAX_NOTICES {
            self.notices.remove(0);
        }
    }
}

/// The user's current choices for one file.
#[derive(Debug, Clone, PartialEq)]
pub struct FileSettings {
    pub clean_enabled: bool,
    pub selected_columns: Vec<String>,
    pub chart_kind: ChartKind,
    pub x_axis: Option<String>,
    pub y_axis: Option<String>,
    pub export_format: FileFormat,
}

impl FileSettings {
    fn for_table(df: &DataFrame, export_format: FileFormat) -> Self {
        let columns = column_names(df);
        Self {
            clean_enabled: false,
            x_axis: columns.first().cloned(),
            y_axis: numeric_columns(df).into_iter().next(),
            selected_columns: columns,
            chart_kind: ChartKind::default(),
            export_format,
        }
    }
}

/// Result of one upload batch.
#[derive(Debug, Default)]
pub struct IngestSummary {
    pub loaded: Vec<FileKey>,
    pub failed: Vec<(String, String)>,
}

/// All uploaded files of the running app.
pub struct Session {
    config: SweeperConfig,
    entries: Vec<FileEntry>,
    settings: HashMap<FileKey, FileSettings>,
    rejected: Vec<Notice>,
}

impl Session {
    pub fn new(config: SweeperConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
            settings: HashMap::new(),
            rejected: Vec::new(),
        }
    }

    pub fn config(&self) -> &SweeperConfig {
        &self.config
    }

    /// Load each file independently; a bad file is reported and skipped.
    /// Re-uploading a name replaces that entry and resets its settings.
    pub fn ingest(&mut self, files: Vec<UploadedFile>) -> IngestSummary {
        let loader = DataLoader::new(self.config.infer_schema_length);
        let mut summary = IngestSummary::default();

        for file in files {
            let df = match loader.load(&file) {
                Ok(df) => df,
                Err(e) => {
                    log::warn!("Skipping {}: {}", file.name, e);
                    self.rejected
                        .push(Notice::new(NoticeLevel::Error, format!("{}: {}", file.name, e)));
                    summary.failed.push((file.name, e.to_string()));
                    continue;
                }
            };

            let key = file.name.clone();
            let format = FileFormat::from_file_name(&file.name).unwrap_or_default();
            self.settings.insert(
                key.clone(),
                FileSettings::for_table(&df, self.config.default_export_format),
            );

            let entry = FileEntry {
                file,
                format,
                original: df.clone(),
                table: df,
                chart: None,
                notices: Vec::new(),
            };
            match self.entries.iter().position(|e| e.key() == key) {
                Some(idx) => self.entries[idx] = entry,
                None => self.entries.push(entry),
            }
            summary.loaded.push(key);
        }

        summary
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    /// Notices for uploads that could not be ingested.
    pub fn rejected(&self) -> &[Notice] {
        &self.rejected
    }

    pub fn clear_rejected(&mut self) {
        self.rejected.clear();
    }

    pub fn entry(&self, key: &str) -> Result<&FileEntry, SessionError> {
        self.entries
            .iter()
            .find(|e| e.key() == key)
            .ok_or_else(|| SessionError::UnknownFile(key.to_string()))
    }

    fn entry_mut(&mut self, key: &str) -> Result<&mut FileEntry, SessionError> {
        self.entries
            .iter_mut()
            .find(|e| e.key() == key)
            .ok_or_else(|| SessionError::UnknownFile(key.to_string()))
    }

    pub fn settings(&self, key: &str) -> Result<&FileSettings, SessionError> {
        self.settings
            .get(key)
            .ok_or_else(|| SessionError::UnknownFile(key.to_string()))
    }

    #[cfg(test)]
    pub fn settings_mut(&mut self, key: &str) -> Result<&mut FileSettings, SessionError> {
        self.settings
            .get_mut(key)
            .ok_or_else(|| SessionError::UnknownFile(key.to_string()))
    }

    /// Entries alongside the mutable settings map, for drawing widgets.
    pub fn parts_mut(&mut self) -> (&[FileEntry], &mut HashMap<FileKey, FileSettings>) {
        (&self.entries, &mut self.settings)
    }

    /// Collapse exact duplicate rows. Returns the number of rows removed.
    pub fn remove_duplicates(&mut self, key: &str) -> Result<usize, SessionError> {
        let entry = self.entry_mut(key)?;
        let before = entry.table.height();
        entry.table = DataProcessor::remove_duplicates(&entry.table)?;
        let removed = before - entry.table.height();

        log::info!("{}: removed {} duplicate rows", key, removed);
        entry.notify(
            NoticeLevel::Success,
            format!("Duplicates removed! ({} rows)", removed),
        );
        Ok(removed)
    }

    /// Mean-fill missing numeric cells.
    pub fn fill_missing(&mut self, key: &str) -> Result<FillReport, SessionError> {
        let entry = self.entry_mut(key)?;
        let (table, report) = DataProcessor::fill_missing(&entry.table)?;
        entry.table = table;

        log::info!("{}: {}", key, report.summary());
        entry.notify(NoticeLevel::Success, report.summary());
        if !report.skipped.is_empty() {
            entry.notify(
                NoticeLevel::Warning,
                format!(
                    "Columns with no values were left empty: {}",
                    report.skipped.join(", ")
                ),
            );
        }
        Ok(report)
    }

    /// Restore the table as it was ingested.
    pub fn reset(&mut self, key: &str) -> Result<(), SessionError> {
        let export_format = self.config.default_export_format;
        let entry = self.entry_mut(key)?;
        entry.table = entry.original.clone();
        entry.chart = None;
        entry.notify(NoticeLevel::Info, "Table restored to the uploaded data");
        let fresh = FileSettings::for_table(&entry.table, export_format);
        self.settings.insert(key.to_string(), fresh);
        Ok(())
    }

    /// Attach a message to a file, e.g. after its download was saved.
    pub fn notify(
        &mut self,
        key: &str,
        level: NoticeLevel,
        text: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.entry_mut(key)?.notify(level, text);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.retain(|e| e.key() != key);
        self.settings.remove(key);
    }

    /// The table later steps see: narrowed to the selected columns while
    /// cleaning is enabled, the full table otherwise.
    pub fn working_table(&self, key: &str) -> Result<DataFrame, SessionError> {
        let entry = self.entry(key)?;
        let settings = self.settings(key)?;
        if settings.clean_enabled {
            Ok(DataProcessor::select_columns(
                &entry.table,
                &settings.selected_columns,
            )?)
        } else {
            Ok(entry.table.clone())
        }
    }

    /// Build the chart for the file's current selections.
    pub fn generate_chart(&mut self, key: &str) -> Result<ChartData, SessionError> {
        let result = self.prepare_chart_for(key);
        let entry = self.entry_mut(key)?;
        match &result {
            Ok(chart) => {
                log::info!("{}: generated {}", key, chart.title());
                entry.chart = Some(chart.clone());
            }
            Err(e) => {
                log::warn!("{}: chart failed: {}", key, e);
                entry.chart = None;
                entry.notify(NoticeLevel::Error, format!("Error: {}", e));
            }
        }
        result
    }

    fn prepare_chart_for(&self, key: &str) -> Result<ChartData, SessionError> {
        let table = self.working_table(key)?;
        let settings = self.settings(key)?;

        let y_axis = match &settings.y_axis {
            Some(y) => y.clone(),
            None => numeric_columns(&table)
                .into_iter()
                .next()
                .ok_or(ChartError::NoNumericColumns)?,
        };
        let request = ChartRequest {
            kind: settings.chart_kind,
            x_axis: settings.x_axis.clone(),
            y_axis,
        };

        Ok(prepare_chart(&table, &request, self.config.histogram_bins)?)
    }

    /// Serialize the working table in the file's chosen export format.
    pub fn export(&self, key: &str) -> Result<Download, SessionError> {
        let table = self.working_table(key)?;
        let settings = self.settings(key)?;
        let entry = self.entry(key)?;
        Ok(export::export(
            &table,
            settings.export_format,
            &entry.file.name,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv(name: &str, text: &str) -> UploadedFile {
        UploadedFile::new(name, text.as_bytes().to_vec())
    }

    fn session_with(files: Vec<UploadedFile>) -> Session {
        let mut session = Session::new(SweeperConfig::default());
        session.ingest(files);
        session
    }

    #[test]
    fn unsupported_file_is_skipped_and_others_load() {
        let mut session = Session::new(SweeperConfig::default());
        let summary = session.ingest(vec![
            csv("notes.txt", "id\n1\n"),
            csv("data.csv", "id,val\na,1\n"),
        ]);

        assert_eq!(summary.loaded, vec!["data.csv".to_string()]);
        assert_eq!(summary.failed.len(), 1);
        assert!(summary.failed[0].1.contains("Unsupported file type: .txt"));
        assert_eq!(session.entries().len(), 1);
        assert_eq!(session.rejected().len(), 1);
    }

    #[test]
    fn duplicate_scenario() {
        let mut session = session_with(vec![csv("data.csv", "id,val\na,1\na,1\nb,2\n")]);
        let removed = session.remove_duplicates("data.csv").unwrap();

        assert_eq!(removed, 1);
        let expected = df!("id" => ["a", "b"], "val" => [1i64, 2]).unwrap();
        assert!(session.entry("data.csv").unwrap().table.equals(&expected));
    }

    #[test]
    fn fill_scenario() {
        let mut session = session_with(vec![csv("scores.csv", "name,score\nx,10\ny,\nz,30\n")]);
        session.fill_missing("scores.csv").unwrap();

        let table = &session.entry("scores.csv").unwrap().table;
        let score: Vec<Option<f64>> = table
            .column("score")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(score, vec![Some(10.0), Some(20.0), Some(30.0)]);
    }

    #[test]
    fn settings_are_isolated_per_file() {
        let mut session = session_with(vec![
            csv("a.csv", "x,y\n1,2\n"),
            csv("b.csv", "x,y\n3,4\n"),
        ]);

        {
            let a = session.settings_mut("a.csv").unwrap();
            a.clean_enabled = true;
            a.selected_columns = vec!["y".to_string()];
            a.chart_kind = ChartKind::Histogram;
            a.export_format = FileFormat::Spreadsheet;
        }

        let b = session.settings("b.csv").unwrap();
        assert!(!b.clean_enabled);
        assert_eq!(b.selected_columns, vec!["x", "y"]);
        assert_eq!(b.chart_kind, ChartKind::Line);
        assert_eq!(b.export_format, FileFormat::Csv);
        assert_eq!(session.working_table("b.csv").unwrap().width(), 2);
        assert_eq!(session.working_table("a.csv").unwrap().width(), 1);
    }

    #[test]
    fn column_selection_applies_only_while_cleaning() {
        let mut session = session_with(vec![csv("data.csv", "a,b,c\n1,2,3\n")]);
        session.settings_mut("data.csv").unwrap().selected_columns =
            vec!["c".to_string(), "a".to_string()];

        assert_eq!(session.working_table("data.csv").unwrap().width(), 3);

        session.settings_mut("data.csv").unwrap().clean_enabled = true;
        let narrowed = session.working_table("data.csv").unwrap();
        assert_eq!(column_names(&narrowed), vec!["a", "c"]);
    }

    #[test]
    fn stale_chart_column_is_recoverable() {
        let mut session = session_with(vec![csv("data.csv", "id,score\na,10\nb,20\n")]);
        {
            let settings = session.settings_mut("data.csv").unwrap();
            settings.x_axis = Some("id".to_string());
            settings.y_axis = Some("score".to_string());
            settings.clean_enabled = true;
            settings.selected_columns = vec!["score".to_string()];
        }

        let err = session.generate_chart("data.csv").unwrap_err();
        assert!(matches!(
            err,
            SessionError::Chart(ChartError::MissingColumn(ref c)) if c == "id"
        ));
        assert_eq!(
            session.entry("data.csv").unwrap().notices.last().unwrap().level,
            NoticeLevel::Error
        );

        // Histogram does not depend on the removed x column
        session.settings_mut("data.csv").unwrap().chart_kind = ChartKind::Histogram;
        let chart = session.generate_chart("data.csv").unwrap();
        assert!(matches!(chart, ChartData::Histogram { .. }));
        assert!(session.entry("data.csv").unwrap().chart.is_some());
    }

    #[test]
    fn no_numeric_columns_disables_charts() {
        let mut session = session_with(vec![csv("names.csv", "name\nx\ny\n")]);
        assert_eq!(session.settings("names.csv").unwrap().y_axis, None);

        let err = session.generate_chart("names.csv").unwrap_err();
        assert!(matches!(err, SessionError::Chart(ChartError::NoNumericColumns)));
    }

    #[test]
    fn export_scenario_spreadsheet() {
        let mut session = session_with(vec![csv("data.csv", "id,val\na,1\nb,2\n")]);
        session.settings_mut("data.csv").unwrap().export_format = FileFormat::Spreadsheet;

        let download = session.export("data.csv").unwrap();
        assert_eq!(download.file_name, "data.xlsx");
        assert_eq!(
            download.mime_type,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );

        let mut check = Session::new(SweeperConfig::default());
        check.ingest(vec![UploadedFile::new(download.file_name, download.bytes)]);
        let reloaded = &check.entry("data.xlsx").unwrap().table;
        assert_eq!(column_names(reloaded), vec!["id", "val"]);
    }

    #[test]
    fn export_before_cleaning_is_allowed() {
        let session = session_with(vec![csv("data.csv", "id,val\na,1\na,1\n")]);
        let download = session.export("data.csv").unwrap();
        assert_eq!(download.file_name, "data.csv");
        assert_eq!(download.mime_type, "text/csv");
        assert_eq!(String::from_utf8(download.bytes).unwrap(), "id,val\na,1\na,1\n");
    }

    #[test]
    fn reupload_replaces_entry_and_settings() {
        let mut session = session_with(vec![csv("data.csv", "a\n1\n")]);
        session.settings_mut("data.csv").unwrap().clean_enabled = true;

        session.ingest(vec![csv("data.csv", "a,b\n1,2\n")]);
        assert_eq!(session.entries().len(), 1);
        assert_eq!(session.entry("data.csv").unwrap().table.width(), 2);
        assert!(!session.settings("data.csv").unwrap().clean_enabled);
    }

    #[test]
    fn reset_restores_uploaded_table() {
        let mut session = session_with(vec![csv("data.csv", "v\n1\n1\n")]);
        session.remove_duplicates("data.csv").unwrap();
        assert_eq!(session.entry("data.csv").unwrap().table.height(), 1);

        session.reset("data.csv").unwrap();
        assert_eq!(session.entry("data.csv").unwrap().table.height(), 2);
    }

    #[test]
    fn unknown_file_is_an_error() {
        let mut session = Session::new(SweeperConfig::default());
        assert!(matches!(
            session.remove_duplicates("missing.csv"),
            Err(SessionError::UnknownFile(_))
        ));
        assert!(session.export("missing.csv").is_err());
    }

    #[test]
    fn notices_are_bounded() {
        let mut session = session_with(vec![csv("data.csv", "v\n1\n")]);
        for _ in 0..10 {
            session.remove_duplicates("data.csv").unwrap();
        }
        assert_eq!(session.entry("data.csv").unwrap().notices.len(), MAX_NOTICES);
    }
}

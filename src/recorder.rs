//! Optional per-frame CSV recording of pipeline output.

use crate::core::FrameReport;
use crate::store::StoreError;
use std::fs::File;
use std::path::Path;
use std::time::Duration;

/// Header row of the per-frame recording.
pub const RECORDING_HEADER: [&str; 7] = [
    "frame_idx",
    "time_sec",
    "score",
    "level",
    "route",
    "motion",
    "asymmetry",
];

/// Writes one row per processed frame.
pub struct FrameRecorder<W: std::io::Write> {
    writer: csv::Writer<W>,
    rows: u64,
}

impl FrameRecorder<File> {
    /// Create (truncating) a recording file, creating parent directories.
    pub fn create(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::new(File::create(path)?)
    }
}

impl<W: std::io::Write> FrameRecorder<W> {
    pub fn new(inner: W) -> Result<Self, StoreError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        writer.write_record(RECORDING_HEADER)?;
        Ok(Self { writer, rows: 0 })
    }

    /// Append a row for frame `frame_idx`, `elapsed` after capture started.
    pub fn record(
        &mut self,
        frame_idx: u64,
        elapsed: Duration,
        report: &FrameReport,
    ) -> Result<(), StoreError> {
        let components = report.sample.map(|s| s.components).unwrap_or_default();
        self.writer.write_record([
            frame_idx.to_string(),
            format!("{:.3}", elapsed.as_secs_f64()),
            format!("{:.6}", report.smoothed),
            report.state.level.as_str().to_string(),
            report.state.route_label.clone(),
            format!("{:.6}", components.motion),
            format!("{:.6}", components.asymmetry),
        ])?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Flush and return the underlying writer.
    pub fn finish(self) -> Result<W, StoreError> {
        self.writer
            .into_inner()
            .map_err(|e| StoreError::Io(e.error().to_string()))
    }
}

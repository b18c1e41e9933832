//! Append-only CSV log of accepted events.
//!
//! The header row is written only when the file does not exist yet, so
//! restarts keep appending to the same log.

use crate::event::Event;
use chrono::DateTime;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Header row of the durable log.
pub const LOG_HEADER: [&str; 7] = ["ts_iso", "deviceId", "userId", "score", "level", "route", "ts"];

/// Durable log write failures.
#[derive(Debug)]
pub enum StoreError {
    Io(String),
    Csv(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "Event log IO error: {e}"),
            StoreError::Csv(e) => write!(f, "Event log write error: {e}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e.to_string())
    }
}

impl From<csv::Error> for StoreError {
    fn from(e: csv::Error) -> Self {
        StoreError::Csv(e.to_string())
    }
}

/// Row-oriented durable event log.
///
/// Not synchronised on its own; callers serialise appends.
#[derive(Debug, Clone)]
pub struct DurableLog {
    path: PathBuf,
}

impl DurableLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one event, writing the header first if the file is new.
    pub fn append(&self, event: &Event) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let write_header = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if write_header {
            writer.write_record(LOG_HEADER)?;
        }
        writer.write_record(row(event))?;
        writer.flush()?;
        Ok(())
    }
}

/// CSV fields for an event.
pub fn row(event: &Event) -> [String; 7] {
    [
        iso_timestamp(event.ts),
        event.device_id.clone(),
        event.user_id.clone(),
        format!("{:.3}", event.score),
        event.level.as_str().to_string(),
        event.route.clone(),
        event.ts.to_string(),
    ]
}

/// `YYYY-MM-DDTHH:MM:SSZ` for an epoch-seconds value, empty if out of range.
fn iso_timestamp(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_default()
}

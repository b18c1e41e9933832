//! Pipeline run statistics.
//!
//! Counters are plain atomics so recording only needs `&self`. Totals are
//! persisted as JSON and accumulate across runs.

use crate::core::FrameReport;
use crate::emitter::EmitOutcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for the current run.
#[derive(Debug)]
pub struct PipelineStats {
    /// Frames pulled from the capture source
    frames_processed: AtomicU64,
    /// Frames where the detector found a region
    frames_with_region: AtomicU64,
    /// Cooldown-gated alerts raised
    alerts_raised: AtomicU64,
    /// Events the ingestion service accepted
    events_delivered: AtomicU64,
    /// Events the ingestion service refused
    events_rejected: AtomicU64,
    /// Delivery attempts that failed in transport
    delivery_failures: AtomicU64,
    /// Run start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self {
            frames_processed: AtomicU64::new(0),
            frames_with_region: AtomicU64::new(0),
            alerts_raised: AtomicU64::new(0),
            events_delivered: AtomicU64::new(0),
            events_rejected: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create stats that load and save cumulative totals at `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut stats = Self::new();
        stats.persist_path = Some(path);

        if let Err(e) = stats.load() {
            tracing::warn!("Could not load previous pipeline stats: {}", e);
        }

        stats
    }

    /// Record the outcome of one processed frame.
    pub fn record_frame(&self, report: &FrameReport) {
        self.frames_processed.fetch_add(1, Ordering::Relaxed);
        if report.region_detected() {
            self.frames_with_region.fetch_add(1, Ordering::Relaxed);
        }
        if report.alert_raised {
            self.alerts_raised.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record the outcome of an emission attempt.
    pub fn record_emit(&self, outcome: &EmitOutcome) {
        let counter = match outcome {
            EmitOutcome::Skipped => return,
            EmitOutcome::Delivered { .. } => &self.events_delivered,
            EmitOutcome::Rejected { .. } => &self.events_rejected,
            EmitOutcome::Failed(_) => &self.delivery_failures,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            frames_processed: self.frames_processed.load(Ordering::Relaxed),
            frames_with_region: self.frames_with_region.load(Ordering::Relaxed),
            alerts_raised: self.alerts_raised.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            events_rejected: self.events_rejected.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let s = self.snapshot();
        format!(
            "Session Statistics:\n\
             - Frames processed: {}\n\
             - Frames with region: {}\n\
             - Alerts raised: {}\n\
             - Events delivered: {}\n\
             - Events rejected: {}\n\
             - Delivery failures: {}\n\
             - Session duration: {} seconds",
            s.frames_processed,
            s.frames_with_region,
            s.alerts_raised,
            s.events_delivered,
            s.events_rejected,
            s.delivery_failures,
            s.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let s = self.snapshot();
            let persisted = PersistedStats {
                frames_processed: s.frames_processed,
                frames_with_region: s.frames_with_region,
                alerts_raised: s.alerts_raised,
                events_delivered: s.events_delivered,
                events_rejected: s.events_rejected,
                delivery_failures: s.delivery_failures,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;
            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        let Some(path) = self.persist_path.as_ref() else {
            return Ok(());
        };
        if let Some(p) = load_persisted(path)? {
            self.frames_processed.store(p.frames_processed, Ordering::Relaxed);
            self.frames_with_region.store(p.frames_with_region, Ordering::Relaxed);
            self.alerts_raised.store(p.alerts_raised, Ordering::Relaxed);
            self.events_delivered.store(p.events_delivered, Ordering::Relaxed);
            self.events_rejected.store(p.events_rejected, Ordering::Relaxed);
            self.delivery_failures.store(p.delivery_failures, Ordering::Relaxed);
        }
        Ok(())
    }
}

impl Default for PipelineStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub frames_processed: u64,
    pub frames_with_region: u64,
    pub alerts_raised: u64,
    pub events_delivered: u64,
    pub events_rejected: u64,
    pub delivery_failures: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
pub struct PersistedStats {
    pub frames_processed: u64,
    pub frames_with_region: u64,
    pub alerts_raised: u64,
    pub events_delivered: u64,
    pub events_rejected: u64,
    pub delivery_failures: u64,
    pub last_updated: DateTime<Utc>,
}

/// Read persisted totals, `None` if the file does not exist yet.
pub fn load_persisted(path: &Path) -> Result<Option<PersistedStats>, std::io::Error> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map(Some)
        .map_err(std::io::Error::other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AlertLevel, AlertState, ScoreSample};
    use crate::emitter::DeliveryError;

    fn report(region: bool, alert: bool) -> FrameReport {
        FrameReport {
            sample: region.then(ScoreSample::default),
            smoothed: 0.0,
            state: AlertState {
                level: AlertLevel::Low,
                route_label: String::new(),
            },
            alert_raised: alert,
        }
    }

    #[test]
    fn test_counting() {
        let stats = PipelineStats::new();
        stats.record_frame(&report(true, true));
        stats.record_frame(&report(false, false));
        stats.record_emit(&EmitOutcome::Skipped);
        stats.record_emit(&EmitOutcome::Delivered { status: 200 });
        stats.record_emit(&EmitOutcome::Failed(DeliveryError::Network("down".to_string())));

        let s = stats.snapshot();
        assert_eq!(s.frames_processed, 2);
        assert_eq!(s.frames_with_region, 1);
        assert_eq!(s.alerts_raised, 1);
        assert_eq!(s.events_delivered, 1);
        assert_eq!(s.delivery_failures, 1);
        assert_eq!(s.events_rejected, 0);
    }

    #[test]
    fn test_persistence_accumulates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pipeline_stats.json");

        let first = PipelineStats::with_persistence(path.clone());
        first.record_frame(&report(true, false));
        first.save().unwrap();

        let second = PipelineStats::with_persistence(path.clone());
        second.record_frame(&report(true, false));
        assert_eq!(second.snapshot().frames_processed, 2);
        second.save().unwrap();

        let persisted = load_persisted(&path).unwrap().unwrap();
        assert_eq!(persisted.frames_with_region, 2);
    }

    #[test]
    fn test_summary_format() {
        let summary = PipelineStats::new().summary();
        assert!(summary.contains("Frames processed"));
        assert!(summary.contains("Delivery failures"));
    }
}

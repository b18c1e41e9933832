//! Ingestion service core: validation, bounded buffer and durable log.
//!
//! Submissions take a single write lock covering both the buffer and the
//! log, so concurrent submitters cannot interleave between the two appends.
//! Readers take the read lock and see a consistent snapshot.

use crate::event::{Event, EventSubmission, ValidationError};
use crate::store::buffer::EventBuffer;
use crate::store::log::{DurableLog, StoreError};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

/// Default number of events returned by [`IngestionService::list`].
pub const DEFAULT_LIST_LIMIT: usize = 100;

/// Ingestion error types.
#[derive(Debug)]
pub enum IngestError {
    /// Event violated a field constraint and was not stored
    Validation(ValidationError),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::Validation(e) => write!(f, "Validation failed: {e}"),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<ValidationError> for IngestError {
    fn from(e: ValidationError) -> Self {
        IngestError::Validation(e)
    }
}

/// Acknowledgement of an accepted event.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitAck {
    pub ok: bool,
    /// Present and `true` when the durable log append failed
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

struct IngestState {
    buffer: EventBuffer,
    log: DurableLog,
}

/// Shared accumulator behind the HTTP surface.
pub struct IngestionService {
    state: RwLock<IngestState>,
}

impl IngestionService {
    pub fn new(capacity: usize, log: DurableLog) -> Self {
        Self {
            state: RwLock::new(IngestState {
                buffer: EventBuffer::new(capacity),
                log,
            }),
        }
    }

    /// Validate, stamp, log and buffer an event.
    ///
    /// A log write failure does not reject the event: it is still buffered
    /// and the acknowledgement is flagged as degraded.
    pub async fn submit(&self, submission: EventSubmission) -> Result<SubmitAck, IngestError> {
        let mut event = submission.validate()?;
        event.received_at = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true));

        let mut state = self.state.write().await;
        // File IO runs on the blocking pool; the write guard stays held so
        // log order matches buffer order.
        let log = state.log.clone();
        let logged = event.clone();
        let durable = tokio::task::spawn_blocking(move || log.append(&logged))
            .await
            .unwrap_or_else(|e| Err(StoreError::Io(format!("log task failed: {e}"))));
        state.buffer.push(event);
        drop(state);

        Ok(match durable {
            Ok(()) => SubmitAck {
                ok: true,
                degraded: false,
                warning: None,
            },
            Err(e) => {
                tracing::warn!("Event buffered but not persisted: {}", e);
                SubmitAck {
                    ok: true,
                    degraded: true,
                    warning: Some(degraded_warning(&e)),
                }
            }
        })
    }

    /// Most recently accepted event.
    pub async fn last(&self) -> Option<Event> {
        self.state.read().await.buffer.last().cloned()
    }

    /// Up to `limit` most recent events, newest last.
    pub async fn list(&self, limit: usize) -> Vec<Event> {
        self.state.read().await.buffer.recent(limit)
    }

    /// Number of events currently buffered.
    pub async fn len(&self) -> usize {
        self.state.read().await.buffer.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn degraded_warning(e: &StoreError) -> String {
    format!("durable log unavailable: {e}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AlertLevel;
    use std::sync::Arc;

    fn submission(score: f64, ts: i64) -> EventSubmission {
        EventSubmission {
            device_id: "d1".to_string(),
            user_id: "u1".to_string(),
            score,
            level: "alto".to_string(),
            route: "pause now".to_string(),
            ts,
        }
    }

    fn service(dir: &tempfile::TempDir, capacity: usize) -> IngestionService {
        IngestionService::new(capacity, DurableLog::new(dir.path().join("events_log.csv")))
    }

    #[tokio::test]
    async fn test_submit_then_last() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service(&dir, 10);
        assert!(service.last().await.is_none());

        let ack = service.submit(submission(0.9, 1_700_000_000)).await.unwrap();
        assert!(ack.ok);
        assert!(!ack.degraded);

        let last = service.last().await.unwrap();
        assert_eq!(last.level, AlertLevel::High);
        assert_eq!(last.ts, 1_700_000_000);
        assert!(last.received_at.unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn test_rejected_event_not_stored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service(&dir, 10);

        let err = service.submit(submission(1.5, 1)).await.unwrap_err();
        assert!(matches!(err, IngestError::Validation(ValidationError::ScoreOutOfRange(_))));
        assert_eq!(service.len().await, 0);
        assert!(!dir.path().join("events_log.csv").exists());
    }

    #[tokio::test]
    async fn test_capacity_bound() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = service(&dir, 5);
        for ts in 0..6 {
            service.submit(submission(0.5, ts)).await.unwrap();
        }

        let listed = service.list(6).await;
        assert_eq!(listed.len(), 5);
        assert!(listed.iter().all(|e| e.ts != 0));
        assert_eq!(listed.last().map(|e| e.ts), Some(5));

        // The log keeps everything
        let content = std::fs::read_to_string(dir.path().join("events_log.csv")).unwrap();
        assert_eq!(content.lines().count(), 7);
    }

    #[tokio::test]
    async fn test_log_failure_degrades_but_buffers() {
        let dir = tempfile::tempdir().expect("tempdir");
        // A directory where the log file should be makes every append fail.
        let log_path = dir.path().join("events_log.csv");
        std::fs::create_dir_all(&log_path).unwrap();
        let service = IngestionService::new(10, DurableLog::new(&log_path));

        let ack = service.submit(submission(0.2, 1)).await.unwrap();
        assert!(ack.ok);
        assert!(ack.degraded);
        assert!(ack.warning.is_some());
        assert_eq!(service.len().await, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submissions() {
        let dir = tempfile::tempdir().expect("tempdir");
        let service = Arc::new(service(&dir, 1000));

        let handles: Vec<_> = (0..50)
            .map(|ts| {
                let service = service.clone();
                tokio::spawn(async move { service.submit(submission(0.3, ts)).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(service.len().await, 50);
        let content = std::fs::read_to_string(dir.path().join("events_log.csv")).unwrap();
        assert_eq!(content.lines().count(), 51);
        assert_eq!(content.matches("ts_iso").count(), 1);

        let logged: Vec<i64> = content
            .lines()
            .skip(1)
            .map(|line| line.rsplit(',').next().unwrap().parse().unwrap())
            .collect();
        let buffered: Vec<i64> = service.list(50).await.iter().map(|e| e.ts).collect();
        assert_eq!(logged, buffered);
    }
}

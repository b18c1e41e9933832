//! Rate-limited, best-effort event emission.
//!
//! The cadence gate lives in [`EventEmitter`]; actual delivery is behind the
//! [`Transport`] trait so the blocking HTTP client can be swapped out without
//! touching the frame pipeline.

use crate::core::FrameReport;
use crate::event::Event;
use chrono::Utc;
use std::time::{Duration, Instant};

/// Default minimum spacing between delivery attempts.
pub const DEFAULT_PUSH_INTERVAL: Duration = Duration::from_secs(1);

/// Delivery error types.
#[derive(Debug)]
pub enum DeliveryError {
    /// Client could not be constructed
    Config(String),
    /// Connection failure or timeout
    Network(String),
    /// Server returned a non-success status
    Server { status: u16, message: String },
    /// JSON serialization error
    Serialization(String),
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryError::Config(msg) => write!(f, "Ingest client config error: {msg}"),
            DeliveryError::Network(msg) => write!(f, "Ingest network error: {msg}"),
            DeliveryError::Server { status, message } => {
                write!(f, "Ingest server error ({status}): {message}")
            }
            DeliveryError::Serialization(msg) => write!(f, "Ingest serialization error: {msg}"),
        }
    }
}

impl std::error::Error for DeliveryError {}

/// Delivers a single event, returning the HTTP status on success.
pub trait Transport {
    fn deliver(&self, event: &Event) -> Result<u16, DeliveryError>;
}

/// Identity stamped on every emitted event.
#[derive(Debug, Clone)]
pub struct EmitterIdentity {
    pub device_id: String,
    pub user_id: String,
}

/// Result of one [`EventEmitter::maybe_emit`] call.
#[derive(Debug)]
pub enum EmitOutcome {
    /// Push interval has not elapsed
    Skipped,
    /// Service accepted the event
    Delivered { status: u16 },
    /// Service answered with an error status
    Rejected { status: u16, message: String },
    /// Transport failed (timeout, unreachable, ...)
    Failed(DeliveryError),
}

/// At-most-once emitter: one attempt per push interval, no retries, no queue.
pub struct EventEmitter<T: Transport> {
    transport: T,
    identity: EmitterIdentity,
    push_interval: Duration,
    last_push: Option<Instant>,
}

impl<T: Transport> EventEmitter<T> {
    pub fn new(transport: T, identity: EmitterIdentity, push_interval: Duration) -> Self {
        Self {
            transport,
            identity,
            push_interval,
            last_push: None,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Whether a push attempt is due at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_push {
            Some(last) => now.saturating_duration_since(last) >= self.push_interval,
            None => true,
        }
    }

    /// Build the event for a frame report, stamped with the current wall clock.
    pub fn build_event(&self, report: &FrameReport) -> Event {
        Event {
            device_id: self.identity.device_id.clone(),
            user_id: self.identity.user_id.clone(),
            score: round3(report.smoothed),
            level: report.state.level,
            route: report.state.route_label.clone(),
            ts: Utc::now().timestamp(),
            received_at: None,
        }
    }

    /// Attempt delivery if the push interval has elapsed.
    ///
    /// The cadence clock advances on every attempt, whether or not it succeeded.
    pub fn maybe_emit(&mut self, now: Instant, report: &FrameReport) -> EmitOutcome {
        if !self.is_due(now) {
            return EmitOutcome::Skipped;
        }

        let event = self.build_event(report);
        let outcome = match self.transport.deliver(&event) {
            Ok(status) => {
                tracing::debug!(status, level = %event.level, score = event.score, "Event delivered");
                EmitOutcome::Delivered { status }
            }
            Err(DeliveryError::Server { status, message }) => {
                tracing::warn!(status, %message, "Event rejected by ingestion service");
                EmitOutcome::Rejected { status, message }
            }
            Err(e) => {
                tracing::warn!("Failed to send event: {}", e);
                EmitOutcome::Failed(e)
            }
        };
        self.last_push = Some(now);
        outcome
    }
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AlertLevel, AlertState, NO_REGION_LABEL};
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingTransport {
        sent: RefCell<Vec<Event>>,
        fail: bool,
        reject: bool,
    }

    impl Transport for RecordingTransport {
        fn deliver(&self, event: &Event) -> Result<u16, DeliveryError> {
            self.sent.borrow_mut().push(event.clone());
            if self.fail {
                Err(DeliveryError::Network("connection refused".to_string()))
            } else if self.reject {
                Err(DeliveryError::Server {
                    status: 422,
                    message: "score must be within [0, 1]".to_string(),
                })
            } else {
                Ok(200)
            }
        }
    }

    fn identity() -> EmitterIdentity {
        EmitterIdentity {
            device_id: "edge-01".to_string(),
            user_id: "demo".to_string(),
        }
    }

    fn report(smoothed: f64, level: AlertLevel) -> FrameReport {
        FrameReport {
            sample: None,
            smoothed,
            state: AlertState {
                level,
                route_label: "carry on calmly".to_string(),
            },
            alert_raised: false,
        }
    }

    #[test]
    fn test_first_call_emits_then_gates() {
        let mut emitter = EventEmitter::new(
            RecordingTransport::default(),
            identity(),
            Duration::from_secs(1),
        );
        let t0 = Instant::now();
        let r = report(0.4567, AlertLevel::Low);

        assert!(matches!(emitter.maybe_emit(t0, &r), EmitOutcome::Delivered { status: 200 }));
        assert!(matches!(
            emitter.maybe_emit(t0 + Duration::from_millis(500), &r),
            EmitOutcome::Skipped
        ));
        assert!(matches!(
            emitter.maybe_emit(t0 + Duration::from_millis(1000), &r),
            EmitOutcome::Delivered { .. }
        ));

        let sent = emitter.transport().sent.borrow();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].score, 0.457);
        assert_eq!(sent[0].device_id, "edge-01");
    }

    #[test]
    fn test_spacing_never_below_interval() {
        let mut emitter = EventEmitter::new(
            RecordingTransport::default(),
            identity(),
            Duration::from_millis(1000),
        );
        let t0 = Instant::now();
        let r = report(0.2, AlertLevel::Low);

        let mut attempts = Vec::new();
        for frame in 0..300 {
            let now = t0 + Duration::from_millis(frame * 33);
            if !matches!(emitter.maybe_emit(now, &r), EmitOutcome::Skipped) {
                attempts.push(now);
            }
        }
        assert!(attempts.len() > 1);
        for pair in attempts.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(1000));
        }
    }

    #[test]
    fn test_failure_still_advances_clock() {
        let transport = RecordingTransport {
            fail: true,
            ..Default::default()
        };
        let mut emitter = EventEmitter::new(transport, identity(), Duration::from_secs(1));
        let t0 = Instant::now();
        let r = report(0.9, AlertLevel::High);

        assert!(matches!(emitter.maybe_emit(t0, &r), EmitOutcome::Failed(_)));
        assert!(matches!(
            emitter.maybe_emit(t0 + Duration::from_millis(10), &r),
            EmitOutcome::Skipped
        ));
        assert_eq!(emitter.transport().sent.borrow().len(), 1);
    }

    #[test]
    fn test_rejection_reported_and_clock_advances() {
        let transport = RecordingTransport {
            reject: true,
            ..Default::default()
        };
        let mut emitter = EventEmitter::new(transport, identity(), Duration::from_secs(1));
        let t0 = Instant::now();
        let r = report(0.9, AlertLevel::High);

        match emitter.maybe_emit(t0, &r) {
            EmitOutcome::Rejected { status, message } => {
                assert_eq!(status, 422);
                assert!(message.contains("score"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert!(!emitter.is_due(t0 + Duration::from_millis(999)));
        assert!(matches!(
            emitter.maybe_emit(t0 + Duration::from_millis(10), &r),
            EmitOutcome::Skipped
        ));
        assert!(emitter.is_due(t0 + Duration::from_secs(1)));
        assert_eq!(emitter.transport().sent.borrow().len(), 1);
    }

    #[test]
    fn test_neutral_frames_are_emitted() {
        let mut emitter = EventEmitter::new(
            RecordingTransport::default(),
            identity(),
            Duration::from_secs(1),
        );
        let r = FrameReport {
            sample: None,
            smoothed: 0.0,
            state: AlertState {
                level: AlertLevel::Neutral,
                route_label: NO_REGION_LABEL.to_string(),
            },
            alert_raised: false,
        };
        emitter.maybe_emit(Instant::now(), &r);

        let sent = emitter.transport().sent.borrow();
        assert_eq!(sent[0].level, AlertLevel::Neutral);
        assert_eq!(sent[0].route, NO_REGION_LABEL);
        assert_eq!(sent[0].score, 0.0);
    }
}

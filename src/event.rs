//! Event records exchanged between the edge pipeline and the ingestion service.

use crate::core::AlertLevel;
use serde::{Deserialize, Serialize};

/// A validated alert-state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub device_id: String,
    pub user_id: String,
    /// Smoothed score in [0, 1]
    pub score: f64,
    pub level: AlertLevel,
    pub route: String,
    /// Client-supplied epoch seconds; may be out of order or duplicated
    pub ts: i64,
    /// Assigned by the ingestion service on acceptance (RFC3339 UTC)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub received_at: Option<String>,
}

/// An event as posted by a client, before validation.
///
/// `level` stays a string here so an unknown tag can be reported as a
/// validation failure instead of a body parse failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSubmission {
    pub device_id: String,
    pub user_id: String,
    pub score: f64,
    pub level: String,
    pub route: String,
    pub ts: i64,
}

/// A field constraint an event violated.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    ScoreOutOfRange(f64),
    UnknownLevel(String),
}

impl ValidationError {
    /// Name of the offending wire field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::ScoreOutOfRange(_) => "score",
            ValidationError::UnknownLevel(_) => "level",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::ScoreOutOfRange(s) => {
                write!(f, "score must be within [0, 1], got {s}")
            }
            ValidationError::UnknownLevel(l) => write!(
                f,
                "level must be one of leve, medio, alto, neutro, got {l:?}"
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

impl EventSubmission {
    /// Check field constraints and produce an [`Event`].
    pub fn validate(self) -> Result<Event, ValidationError> {
        if !self.score.is_finite() || !(0.0..=1.0).contains(&self.score) {
            return Err(ValidationError::ScoreOutOfRange(self.score));
        }
        let level =
            AlertLevel::from_tag(&self.level).ok_or(ValidationError::UnknownLevel(self.level))?;

        Ok(Event {
            device_id: self.device_id,
            user_id: self.user_id,
            score: self.score,
            level,
            route: self.route,
            ts: self.ts,
            received_at: None,
        })
    }
}

impl From<Event> for EventSubmission {
    fn from(event: Event) -> Self {
        Self {
            device_id: event.device_id,
            user_id: event.user_id,
            score: event.score,
            level: event.level.as_str().to_string(),
            route: event.route,
            ts: event.ts,
        }
    }
}

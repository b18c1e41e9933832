//! Core functionality for the Stress Sensor Agent.
//!
//! This module contains:
//! - Frame scoring from pixel heuristics
//! - Trailing-window smoothing
//! - Alert classification with route suggestions
//! - The per-frame pipeline tying them together

pub mod pipeline;
pub mod routing;
pub mod scoring;
pub mod smoothing;

// Re-export commonly used types
pub use pipeline::{FramePipeline, FrameReport, PipelineSettings};
pub use routing::{
    AlertCooldown, AlertLevel, AlertState, PolicyError, RouteClassifier, RoutePolicy, RouteTier,
    TierBound, NO_REGION_LABEL,
};
pub use scoring::{FrameScorer, ScoreSample, SignalBreakdown, TrackState};
pub use smoothing::Smoother;

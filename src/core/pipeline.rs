//! Per-frame processing: score, smooth, classify, and gate alerts.

use crate::capture::{Frame, Region};
use crate::core::routing::{AlertCooldown, AlertState, RouteClassifier, RoutePolicy};
use crate::core::scoring::{FrameScorer, ScoreSample, TrackState};
use crate::core::smoothing::Smoother;
use std::time::{Duration, Instant};

/// Tunables for [`FramePipeline`].
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub window_size: usize,
    pub threshold: f64,
    pub cooldown: Duration,
    pub asymmetry_gain: f64,
    pub policy: RoutePolicy,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            window_size: crate::core::smoothing::DEFAULT_WINDOW,
            threshold: 0.65,
            cooldown: crate::core::routing::DEFAULT_COOLDOWN,
            asymmetry_gain: crate::core::scoring::DEFAULT_ASYMMETRY_GAIN,
            policy: RoutePolicy::default(),
        }
    }
}

/// What the pipeline concluded for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Raw sample, `None` when no region was detected
    pub sample: Option<ScoreSample>,
    /// Smoothed score (0 on the no-region path)
    pub smoothed: f64,
    pub state: AlertState,
    /// Whether the cooldown gate raised an alert on this frame
    pub alert_raised: bool,
}

impl FrameReport {
    pub fn region_detected(&self) -> bool {
        self.sample.is_some()
    }
}

/// Synchronous scorer → smoother → classifier chain for one capture session.
pub struct FramePipeline {
    scorer: FrameScorer,
    track: TrackState,
    smoother: Smoother,
    classifier: RouteClassifier,
    cooldown: AlertCooldown,
    threshold: f64,
}

impl FramePipeline {
    pub fn new(settings: PipelineSettings) -> Self {
        Self {
            scorer: FrameScorer::new(settings.asymmetry_gain),
            track: TrackState::new(),
            smoother: Smoother::new(settings.window_size),
            classifier: RouteClassifier::new(settings.policy),
            cooldown: AlertCooldown::new(settings.cooldown),
            threshold: settings.threshold,
        }
    }

    /// Process one frame. `region` is the detector output for this frame.
    pub fn process(&mut self, frame: &Frame, region: Option<Region>, now: Instant) -> FrameReport {
        let Some(region) = region else {
            return FrameReport {
                sample: None,
                smoothed: 0.0,
                state: self.classifier.classify_absent(),
                alert_raised: false,
            };
        };

        let track = std::mem::take(&mut self.track);
        let (sample, track) = self.scorer.score(track, frame, region);
        self.track = track;

        let smoothed = self.smoother.push(sample.raw);
        let state = self.classifier.classify(smoothed, self.threshold);

        let alert_raised = self.cooldown.check(now, smoothed, self.threshold);
        if alert_raised {
            tracing::warn!(
                route = %state.route_label,
                level = %state.level,
                score = format_args!("{smoothed:.2}"),
                motion = format_args!("{:.3}", sample.components.motion),
                asymmetry = format_args!("{:.3}", sample.components.asymmetry),
                "Stress alert"
            );
        }

        FrameReport {
            sample: Some(sample),
            smoothed,
            state,
            alert_raised,
        }
    }
}

//! Per-frame stress scoring from pixel heuristics.
//!
//! The score is a heuristic proxy built from two signals over the region
//! of interest: inter-frame motion and a lower-vs-upper brightness
//! asymmetry. It is not a validated biometric.

use crate::capture::{Frame, LumaPatch, Region};
use serde::{Deserialize, Serialize};

/// Weight of the motion signal in the raw score.
pub const MOTION_WEIGHT: f64 = 0.55;

/// Weight of the asymmetry signal in the raw score.
pub const ASYMMETRY_WEIGHT: f64 = 0.45;

/// Default gain applied to the brightness asymmetry.
pub const DEFAULT_ASYMMETRY_GAIN: f64 = 2.0;

/// Contribution of each signal, all in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalBreakdown {
    /// Mean absolute intensity change against the previous patch
    pub motion: f64,
    /// Lower-half minus upper-half brightness, scaled ("mouth-open" proxy)
    pub asymmetry: f64,
}

/// Score for one frame with a detected region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreSample {
    pub raw: f64,
    pub components: SignalBreakdown,
}

/// Motion reference for one detection track.
///
/// Owned by the caller and threaded through each [`FrameScorer::score`] call.
#[derive(Debug, Clone, Default)]
pub struct TrackState {
    previous: Option<LumaPatch>,
}

impl TrackState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a previous patch is available for motion comparison.
    pub fn has_reference(&self) -> bool {
        self.previous.is_some()
    }
}

/// Stateless scorer; all per-track state lives in [`TrackState`].
#[derive(Debug, Clone)]
pub struct FrameScorer {
    asymmetry_gain: f64,
}

impl Default for FrameScorer {
    fn default() -> Self {
        Self::new(DEFAULT_ASYMMETRY_GAIN)
    }
}

impl FrameScorer {
    pub fn new(asymmetry_gain: f64) -> Self {
        Self { asymmetry_gain }
    }

    /// Score `region` of `frame` against the track's previous patch.
    ///
    /// An empty region yields a zero sample and hands the track back untouched.
    pub fn score(&self, track: TrackState, frame: &Frame, region: Region) -> (ScoreSample, TrackState) {
        let patch = frame.crop(region);
        if patch.is_empty() {
            return (ScoreSample::default(), track);
        }

        let motion = match &track.previous {
            Some(prev) if prev.same_shape(&patch) => mean_abs_diff(prev.pixels(), patch.pixels()),
            _ => 0.0,
        };
        let asymmetry = self.asymmetry(&patch);
        let raw = clamp01(MOTION_WEIGHT * motion + ASYMMETRY_WEIGHT * asymmetry);

        let sample = ScoreSample {
            raw,
            components: SignalBreakdown { motion, asymmetry },
        };
        (
            sample,
            TrackState {
                previous: Some(patch),
            },
        )
    }

    fn asymmetry(&self, patch: &LumaPatch) -> f64 {
        let (top, bottom) = patch.split_halves();
        if top.is_empty() || bottom.is_empty() {
            return 0.0;
        }
        let diff = (mean(bottom) - mean(top)).max(0.0) / 255.0;
        clamp01(diff * self.asymmetry_gain)
    }
}

fn mean(pixels: &[u8]) -> f64 {
    pixels.iter().map(|&p| p as f64).sum::<f64>() / pixels.len() as f64
}

fn mean_abs_diff(a: &[u8], b: &[u8]) -> f64 {
    let total: u64 = a.iter().zip(b).map(|(x, y)| x.abs_diff(*y) as u64).sum();
    clamp01(total as f64 / a.len() as f64 / 255.0)
}

/// Clamp to [0, 1], mapping NaN to 0.
pub(crate) fn clamp01(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Frame whose top half is `top` and bottom half is `bottom`.
    fn split_frame(width: usize, height: usize, top: u8, bottom: u8) -> Frame {
        let mut luma = vec![top; width * (height / 2)];
        luma.extend(vec![bottom; width * (height - height / 2)]);
        Frame::new(width, height, luma).unwrap()
    }

    #[test]
    fn test_first_frame_has_no_motion() {
        let scorer = FrameScorer::default();
        let frame = Frame::filled(4, 4, 100);
        let (sample, track) = scorer.score(TrackState::new(), &frame, Region::new(0, 0, 4, 4));

        assert_eq!(sample.components.motion, 0.0);
        assert_eq!(sample.raw, 0.0);
        assert!(track.has_reference());
    }

    #[test]
    fn test_motion_between_frames() {
        let scorer = FrameScorer::default();
        let region = Region::new(0, 0, 4, 4);
        let (_, track) = scorer.score(TrackState::new(), &Frame::filled(4, 4, 0), region);
        let (sample, _) = scorer.score(track, &Frame::filled(4, 4, 255), region);

        assert!((sample.components.motion - 1.0).abs() < 1e-9);
        assert!((sample.raw - MOTION_WEIGHT).abs() < 1e-9);
    }

    #[test]
    fn test_shape_change_resets_motion() {
        let scorer = FrameScorer::default();
        let (_, track) = scorer.score(
            TrackState::new(),
            &Frame::filled(8, 8, 0),
            Region::new(0, 0, 4, 4),
        );
        let (sample, _) = scorer.score(track, &Frame::filled(8, 8, 255), Region::new(0, 0, 6, 6));
        assert_eq!(sample.components.motion, 0.0);
    }

    #[test]
    fn test_asymmetry_gain_and_floor() {
        let scorer = FrameScorer::default();
        let region = Region::new(0, 0, 4, 4);

        // Brighter bottom: (51 / 255) * 2 = 0.4
        let (sample, _) = scorer.score(TrackState::new(), &split_frame(4, 4, 0, 51), region);
        assert!((sample.components.asymmetry - 0.4).abs() < 1e-9);
        assert!((sample.raw - ASYMMETRY_WEIGHT * 0.4).abs() < 1e-9);

        // Brighter top is floored at zero
        let (sample, _) = scorer.score(TrackState::new(), &split_frame(4, 4, 200, 0), region);
        assert_eq!(sample.components.asymmetry, 0.0);

        // Large difference saturates
        let (sample, _) = scorer.score(TrackState::new(), &split_frame(4, 4, 0, 255), region);
        assert_eq!(sample.components.asymmetry, 1.0);
    }

    #[test]
    fn test_empty_region_keeps_track() {
        let scorer = FrameScorer::default();
        let region = Region::new(0, 0, 4, 4);
        let (_, track) = scorer.score(TrackState::new(), &Frame::filled(4, 4, 0), region);

        let (sample, track) = scorer.score(track, &Frame::filled(4, 4, 255), Region::new(4, 4, 0, 0));
        assert_eq!(sample, ScoreSample::default());

        // Reference is still the original black patch
        let (sample, _) = scorer.score(track, &Frame::filled(4, 4, 255), region);
        assert!((sample.components.motion - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_raw_score_bounds() {
        let scorer = FrameScorer::new(10.0);
        let region = Region::new(0, 0, 4, 4);
        let (_, track) = scorer.score(TrackState::new(), &split_frame(4, 4, 255, 0), region);
        let (sample, _) = scorer.score(track, &split_frame(4, 4, 0, 255), region);

        assert!((0.0..=1.0).contains(&sample.raw));
        assert!((0.0..=1.0).contains(&sample.components.motion));
        assert!((0.0..=1.0).contains(&sample.components.asymmetry));
    }
}

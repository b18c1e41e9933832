//! Region-of-interest detection.
//!
//! Real subject detection is a pluggable capability. The built-in detector
//! tracks a fixed box, which suits a seated subject in a fixed camera.

use crate::capture::types::{Frame, Region};

/// Yields the tracked region for a frame, or `None` when nothing was found.
pub trait RegionDetector {
    fn detect(&mut self, frame: &Frame) -> Option<Region>;
}

/// Detector that reports a configured box, or a centred box covering half
/// of each frame dimension when none is configured.
#[derive(Debug, Clone, Default)]
pub struct FixedRegionDetector {
    region: Option<Region>,
}

impl FixedRegionDetector {
    pub fn new(region: Option<Region>) -> Self {
        Self { region }
    }

    fn centred(frame: &Frame) -> Region {
        let width = frame.width() / 2;
        let height = frame.height() / 2;
        Region::new(
            (frame.width() - width) / 2,
            (frame.height() - height) / 2,
            width,
            height,
        )
    }
}

impl RegionDetector for FixedRegionDetector {
    fn detect(&mut self, frame: &Frame) -> Option<Region> {
        let region = self.region.unwrap_or_else(|| Self::centred(frame));
        // A box that misses the frame entirely counts as "not found".
        if region.x >= frame.width() || region.y >= frame.height() {
            return None;
        }
        Some(region)
    }
}

//! Frame capture for the Stress Sensor Agent.
//!
//! This module provides the luminance frame model, raw frame sources and
//! the region detector seam.

pub mod detector;
pub mod source;
pub mod types;

// Re-export commonly used types
pub use detector::{FixedRegionDetector, RegionDetector};
pub use source::{CaptureError, FrameSource, RawFrameReader};
pub use types::{Frame, LumaPatch, Region};

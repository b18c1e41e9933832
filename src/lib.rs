//! Stress Sensor Agent - video stress-signal pipeline and event ingestion.
//!
//! This library turns a stream of luminance frames into a smoothed stress
//! score, classifies it into alert levels with a suggested route, and ships
//! rate-limited events to a small HTTP ingestion service.
//!
//! The score is a pixel heuristic: motion plus how much brighter the lower
//! half of the region of interest is than the upper half. It is a demo
//! signal, not a physiological measurement.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      Stress Sensor Agent                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │   Capture   │──▶│   Scoring   │──▶│  Smoothing  │        │
//! │  │ (raw luma)  │   │ (per frame) │   │  (window)   │        │
//! │  └─────────────┘   └─────────────┘   └─────────────┘        │
//! │                                              │               │
//! │                                              ▼               │
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐        │
//! │  │  Ingestion  │◀──│   Emitter   │◀──│   Routing   │        │
//! │  │  (server)   │   │ (cadence)   │   │ (tiers)     │        │
//! │  └─────────────┘   └─────────────┘   └─────────────┘        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::time::Instant;
//! use stress_sensor_agent::capture::{Frame, FixedRegionDetector, RegionDetector};
//! use stress_sensor_agent::core::{FramePipeline, PipelineSettings};
//!
//! let mut pipeline = FramePipeline::new(PipelineSettings::default());
//! let mut detector = FixedRegionDetector::new(None);
//!
//! let frame = Frame::filled(64, 48, 128);
//! let region = detector.detect(&frame);
//! let report = pipeline.process(&frame, region, Instant::now());
//! println!("{} -> {}", report.state.level, report.state.route_label);
//! ```

pub mod capture;
pub mod config;
pub mod core;
pub mod emitter;
pub mod event;
pub mod recorder;
pub mod stats;
pub mod store;

#[cfg(feature = "client")]
pub mod client;

#[cfg(feature = "server")]
pub mod server;

// Re-export key types at crate root for convenience
pub use capture::{CaptureError, Frame, FrameSource, RawFrameReader, Region, RegionDetector};
pub use config::{Config, ConfigError};
pub use core::{AlertLevel, AlertState, FramePipeline, FrameReport, PipelineSettings, RoutePolicy};
pub use emitter::{DeliveryError, EmitOutcome, EmitterIdentity, EventEmitter, Transport};
pub use event::{Event, EventSubmission, ValidationError};
pub use stats::PipelineStats;
pub use store::{DurableLog, EventBuffer, IngestionService};

// Client re-exports (when enabled)
#[cfg(feature = "client")]
pub use client::{BlockingIngestClient, IngestClient, IngestConfig};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Event storage for the ingestion service.
//!
//! This module provides the bounded in-memory buffer, the append-only
//! durable log, and the service that keeps both in step.

pub mod buffer;
pub mod log;
pub mod service;

// Re-export commonly used types
pub use buffer::EventBuffer;
pub use log::{DurableLog, StoreError};
pub use service::{IngestError, IngestionService, SubmitAck, DEFAULT_LIST_LIMIT};

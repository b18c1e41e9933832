//! HTTP client for posting events to the ingestion service.

use crate::emitter::{DeliveryError, Transport};
use crate::event::Event;
use std::time::Duration;

/// Default request timeout for a single delivery.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(2500);

/// Ingestion endpoint configuration.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Base URL, e.g. `http://127.0.0.1:8000`
    pub base_url: String,
    /// Bound on each request
    pub timeout: Duration,
}

impl IngestConfig {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into(),
            timeout,
        }
    }

    /// Base URL without a trailing slash.
    pub fn url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Get the events endpoint URL.
    pub fn events_url(&self) -> String {
        format!("{}/events", self.url())
    }

    /// Get the health check endpoint URL.
    pub fn health_url(&self) -> String {
        format!("{}/health", self.url())
    }
}

/// Async client for the ingestion service.
pub struct IngestClient {
    config: IngestConfig,
    client: reqwest::Client,
}

impl IngestClient {
    pub fn new(config: IngestConfig) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DeliveryError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Test connection to the ingestion service.
    pub async fn test_connection(&self) -> Result<bool, DeliveryError> {
        let response = self
            .client
            .get(self.config.health_url())
            .send()
            .await
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }

    /// Post one event, returning the HTTP status on success.
    pub async fn post_event(&self, event: &Event) -> Result<u16, DeliveryError> {
        let response = self
            .client
            .post(self.config.events_url())
            .json(event)
            .send()
            .await
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DeliveryError::Server {
                status: status.as_u16(),
                message,
            });
        }

        Ok(status.as_u16())
    }
}

/// Blocking client for the synchronous frame loop.
pub struct BlockingIngestClient {
    inner: IngestClient,
    runtime: tokio::runtime::Runtime,
}

impl BlockingIngestClient {
    pub fn new(config: IngestConfig) -> Result<Self, DeliveryError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DeliveryError::Config(format!("Failed to create runtime: {e}")))?;

        Ok(Self {
            inner: IngestClient::new(config)?,
            runtime,
        })
    }

    /// Test connection to the ingestion service.
    pub fn test_connection(&self) -> Result<bool, DeliveryError> {
        self.runtime.block_on(self.inner.test_connection())
    }

    pub fn config(&self) -> &IngestConfig {
        self.inner.config()
    }
}

impl Transport for BlockingIngestClient {
    fn deliver(&self, event: &Event) -> Result<u16, DeliveryError> {
        self.runtime.block_on(self.inner.post_event(event))
    }
}

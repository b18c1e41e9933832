//! HTTP surface of the event ingestion service.
//!
//! # Endpoints
//!
//! ```text
//! POST /events          submit one event          -> {"ok": true}
//! GET  /events/last     most recent event         -> event | {}
//! GET  /events?limit=N  recent events, newest last -> [event, ...]
//! GET  /health          liveness                   -> {"status": "ok", ...}
//! ```

use crate::event::EventSubmission;
use crate::store::{DurableLog, IngestError, IngestionService, SubmitAck, DEFAULT_LIST_LIMIT};
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind: IpAddr,
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Number of events kept in memory
    pub capacity: usize,
    /// Durable log location
    pub log_path: PathBuf,
}

impl ServerConfig {
    /// Create a new server configuration bound to localhost
    pub fn new(port: u16, capacity: usize, log_path: PathBuf) -> Self {
        Self {
            bind: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port,
            capacity,
            log_path,
        }
    }
}

/// Shared server state
pub type ServerState = Arc<IngestionService>;

/// Query parameters for GET /events
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    limit: Option<usize>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /events
async fn submit_event(
    State(service): State<ServerState>,
    payload: Result<Json<EventSubmission>, JsonRejection>,
) -> Result<Json<SubmitAck>, ApiError> {
    let Json(submission) = payload.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("Invalid event body: {}", e.body_text()),
                code: "INVALID_BODY".to_string(),
                field: None,
            }),
        )
    })?;

    match service.submit(submission).await {
        Ok(ack) => Ok(Json(ack)),
        Err(IngestError::Validation(e)) => {
            tracing::debug!("Rejected event: {}", e);
            Err((
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorResponse {
                    error: e.to_string(),
                    code: "VALIDATION_ERROR".to_string(),
                    field: Some(e.field().to_string()),
                }),
            ))
        }
    }
}

/// GET /events/last
async fn last_event(State(service): State<ServerState>) -> Json<serde_json::Value> {
    let body = service
        .last()
        .await
        .and_then(|event| serde_json::to_value(event).ok())
        .unwrap_or_else(|| serde_json::json!({}));
    Json(body)
}

/// GET /events
async fn list_events(
    State(service): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<crate::event::Event>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    Json(service.list(limit).await)
}

/// Build the application router around a service.
pub fn router(service: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/events", get(list_events).post(submit_event))
        .route("/events/last", get(last_event))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(service)
}

/// Run the HTTP server
pub async fn run(
    config: ServerConfig,
) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let service = Arc::new(IngestionService::new(
        config.capacity,
        DurableLog::new(config.log_path.clone()),
    ));
    let app = router(service);

    let addr = SocketAddr::new(config.bind, config.port);
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!(
        log = ?config.log_path,
        capacity = config.capacity,
        "Ingestion server listening on http://{}",
        actual_addr
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}

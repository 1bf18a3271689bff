//! FaceChart Sync Server
//!
//! Reference implementation of the remote end of pending-session sync.
//!
//! ## Protocol
//!
//! ```text
//! GET  /health               -> 200 "ok"
//! POST /api/sessions/batch   { "sessions": [ ... ] }
//!                            -> 200 { "accepted": 2, "duplicates": 1 }
//!                            -> 422 { "error": "..." }
//! GET  /api/sessions/{id}    -> 200 session | 404
//! ```
//!
//! Session id is the idempotency key: a resent session is counted as a
//! duplicate and the stored record is left untouched.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use facechart_core::model::{SessionId, SessionStatus, TreatmentSession};
use facechart_core::sync::{BATCH_PATH, BatchError, BatchReceipt, HEALTH_PATH};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

/// Bind address used when `FACECHART_ADDR` is unset.
const DEFAULT_ADDR: &str = "0.0.0.0:3030";

/// Request body of a batch submit.
#[derive(Debug, Deserialize)]
struct BatchSubmission {
    sessions: Vec<TreatmentSession>,
}

/// A session as received.
#[derive(Debug, Clone, Serialize)]
struct StoredSession {
    session: TreatmentSession,
    received_at: DateTime<Utc>,
}

/// Shared application state
struct AppState {
    /// Received sessions by id
    sessions: DashMap<SessionId, StoredSession>,
}

impl AppState {
    fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Store a batch. Either every session is valid or nothing is stored.
    fn ingest(&self, batch: Vec<TreatmentSession>) -> Result<BatchReceipt, String> {
        for session in &batch {
            validate(session)?;
        }

        let received_at = Utc::now();
        let mut receipt = BatchReceipt::default();
        for session in batch {
            match self.sessions.entry(session.id) {
                Entry::Occupied(_) => receipt.duplicates += 1,
                Entry::Vacant(slot) => {
                    slot.insert(StoredSession {
                        session,
                        received_at,
                    });
                    receipt.accepted += 1;
                }
            }
        }
        Ok(receipt)
    }
}

fn validate(session: &TreatmentSession) -> Result<(), String> {
    if session.provider_id.trim().is_empty() {
        return Err(format!("session {} has no provider", session.id));
    }
    if session.patient_id.trim().is_empty() {
        return Err(format!("session {} has no patient", session.id));
    }
    if session.status() == SessionStatus::InProgress {
        return Err(format!("session {} is still in progress", session.id));
    }
    Ok(())
}

fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health))
        .route(BATCH_PATH, post(submit_batch))
        .route("/api/sessions/{id}", get(get_session))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

fn bind_addr() -> SocketAddr {
    let default = || SocketAddr::from(([0, 0, 0, 0], 3030));
    match std::env::var("FACECHART_ADDR") {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid FACECHART_ADDR {:?} ({}), using {}", raw, e, DEFAULT_ADDR);
            default()
        }),
        Err(_) => default(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "facechart_server=info,tower_http=info".into()),
        )
        .init();

    let state = Arc::new(AppState::new());
    let addr = bind_addr();
    info!("FaceChart sync server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app(state)).await?;
    Ok(())
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// Idempotent batch submit
async fn submit_batch(
    State(state): State<Arc<AppState>>,
    Json(batch): Json<BatchSubmission>,
) -> Result<Json<BatchReceipt>, (StatusCode, Json<BatchError>)> {
    let count = batch.sessions.len();
    match state.ingest(batch.sessions) {
        Ok(receipt) => {
            info!(
                "Batch of {}: {} accepted, {} duplicate",
                count, receipt.accepted, receipt.duplicates
            );
            Ok(Json(receipt))
        }
        Err(error) => {
            warn!("Rejected batch of {}: {}", count, error);
            Err((StatusCode::UNPROCESSABLE_ENTITY, Json(BatchError { error })))
        }
    }
}

/// Fetch a received session
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<SessionId>,
) -> Result<Json<StoredSession>, StatusCode> {
    state
        .sessions
        .get(&id)
        .map(|entry| Json(entry.value().clone()))
        .ok_or(StatusCode::NOT_FOUND)
}

//! Dashboard API route handlers.
//!
//! All endpoints return JSON. The engine is shared via `Arc<DashboardState>`;
//! decide and resolve take the write lock, read endpoints take the read lock
//! and may observe state a moment stale.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::engine::DecisionEngine;
use crate::types::{
    ArmPosterior, Decision, DecisionRequest, EngineError, EngineStats, Outcome, PendingDecision,
};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub engine: RwLock<DecisionEngine>,
}

impl DashboardState {
    pub fn new(engine: DecisionEngine) -> Self {
        Self {
            engine: RwLock::new(engine),
        }
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Request/response types
// ---------------------------------------------------------------------------

/// Body for POST /api/outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRequest {
    pub decision_id: Uuid,
    pub reward: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type Rejection = (StatusCode, Json<ErrorResponse>);

fn reject(err: EngineError) -> Rejection {
    let status = match err {
        EngineError::InvalidInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::UnknownDecision(_) => StatusCode::NOT_FOUND,
        EngineError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// POST /api/decide
pub async fn post_decide(
    State(state): State<AppState>,
    Json(request): Json<DecisionRequest>,
) -> Result<Json<Decision>, Rejection> {
    let mut engine = state.engine.write().await;
    engine.decide(&request).map(Json).map_err(reject)
}

/// POST /api/outcomes
pub async fn post_outcome(
    State(state): State<AppState>,
    Json(request): Json<OutcomeRequest>,
) -> Result<Json<Outcome>, Rejection> {
    let mut engine = state.engine.write().await;
    engine
        .resolve(request.decision_id, request.reward)
        .map(Json)
        .map_err(reject)
}

/// GET /api/posteriors
pub async fn get_posteriors(State(state): State<AppState>) -> Json<Vec<ArmPosterior>> {
    let engine = state.engine.read().await;
    Json(engine.posteriors())
}

/// GET /api/stats
pub async fn get_stats(State(state): State<AppState>) -> Json<EngineStats> {
    let engine = state.engine.read().await;
    Json(engine.get_stats())
}

/// GET /api/history
pub async fn get_history(State(state): State<AppState>) -> Json<Vec<Decision>> {
    let engine = state.engine.read().await;
    // Last 100 decisions, oldest first.
    Json(engine.recent_decisions(100).to_vec())
}

/// GET /api/pending
pub async fn get_pending(State(state): State<AppState>) -> Json<Vec<PendingDecision>> {
    let engine = state.engine.read().await;
    Json(engine.pending())
}

/// GET /health
pub async fn health() -> StatusCode {
    StatusCode::OK
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

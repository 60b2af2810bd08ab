//! HTTP routes for the insights service

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Request, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use insight_stock::{ChatMessage, InsightOrchestrator, InsightResponse, StockQuery};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info_span};
use uuid::Uuid;

use crate::error::ApiError;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<InsightOrchestrator>,
}

impl AppState {
    pub fn new(orchestrator: InsightOrchestrator) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub history_len: usize,
}

/// Build the router: `POST /summary`, `GET /history`, `GET /health`
pub fn insight_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request| {
        info_span!(
            "request",
            request_id = %Uuid::new_v4(),
            method = %request.method(),
            uri = %request.uri(),
        )
    });

    Router::new()
        .route("/summary", post(summary))
        .route("/history", get(history))
        .route("/health", get(health))
        .layer(cors)
        .layer(trace)
        .with_state(state)
}

/// Answer a "get insights" request
///
/// The body is validated before any provider is called. The orchestrator runs
/// on its own task so the history appends finish even if the client hangs up.
async fn summary(
    State(state): State<AppState>,
    payload: Result<Json<StockQuery>, JsonRejection>,
) -> Result<Json<InsightResponse>, ApiError> {
    let Json(query) = payload?;
    debug!(symbol = %query.symbol, timeframe = %query.timeframe, "Accepted summary request");

    let orchestrator = Arc::clone(&state.orchestrator);
    let response = tokio::spawn(async move { orchestrator.handle(&query).await })
        .await
        .map_err(|e| ApiError::Internal(format!("insight task failed: {e}")))?;

    Ok(Json(response))
}

async fn history(State(state): State<AppState>) -> Json<Vec<ChatMessage>> {
    Json(state.orchestrator.store().snapshot().await)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        history_len: state.orchestrator.store().len().await,
    })
}

//! Маршрут приёма heartbeat от агентов.

use crate::api::middleware::AgentKey;
use crate::api::AppState;
use crate::error::AppError;
use crate::services::heartbeat_service;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use monitor_types::HeartbeatPayload;

pub fn routes() -> Router<AppState> {
    Router::new().route("/heartbeat", post(receive_heartbeat))
}

/// POST /api/v1/heartbeat: требует заголовок X-API-Key.
async fn receive_heartbeat(
    State(state): State<AppState>,
    _agent: AgentKey,
    body: Result<Json<HeartbeatPayload>, JsonRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let Json(payload) = body?;
    let now = chrono::Utc::now();
    heartbeat_service::ingest_heartbeat(&state.db, state.cache.as_ref(), &payload, now).await?;

    Ok(Json(serde_json::json!({ "status": "ok" })))
}

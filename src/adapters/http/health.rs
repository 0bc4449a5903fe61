//! Liveness endpoint.

use axum::{extract::State, Json};
use serde::Serialize;

use super::RelayState;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct HealthResponse {
    pub status: &'static str,
    pub connections: usize,
    pub rooms: usize,
}

/// `GET /health`
pub async fn health(State(state): State<RelayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        connections: state.hub.connection_count(),
        rooms: state.hub.room_count().await,
    })
}

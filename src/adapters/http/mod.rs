//! HTTP adapters - router assembly and plain endpoints.
//!
//! - `GET /ws` - WebSocket upgrade (see `adapters::websocket`)
//! - `GET /health` - liveness with connection and room counts

mod health;

use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::adapters::websocket::ws_handler;
use crate::application::RoomHub;

pub use health::{health, HealthResponse};

/// State shared by every route.
#[derive(Clone)]
pub struct RelayState {
    pub hub: Arc<RoomHub>,
}

impl RelayState {
    pub fn new(hub: Arc<RoomHub>) -> Self {
        Self { hub }
    }
}

/// Builds the full router with tracing and CORS layers.
pub fn relay_router(state: RelayState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(cors_origins)),
        )
        .with_state(state)
}

/// `*` allows any origin; otherwise only the listed ones. Unparseable
/// origins are skipped.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods([Method::GET, Method::OPTIONS]);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

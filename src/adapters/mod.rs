//! Adapters - Implementations of port interfaces and transports.
//!
//! Adapters connect the relay core to external systems:
//! - `websocket` - client transport (axum WebSocket)
//! - `http` - router assembly and health endpoint
//! - `persistence` - REST persistence collaborator and in-memory fallbacks
//! - `clock` - system and manual clocks

pub mod clock;
pub mod http;
pub mod persistence;
pub mod websocket;

pub use clock::{ManualClock, SystemClock};
pub use http::{relay_router, RelayState};
pub use persistence::{
    HttpPersistenceClient, HttpPersistenceConfig, InMemoryMessageStore, ModerationListRefresher,
    RefreshOutcome, StaticModerationLists,
};

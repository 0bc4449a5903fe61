//! WebSocket transport for the chat relay.
//!
//! # Architecture
//!
//! ```text
//!   client ──frames──▶ recv task ──▶ ConnectionSession ──▶ RoomHub
//!                                                            │
//!   client ◀──frames── send task ◀── mpsc outbound queue ◀───┘
//! ```
//!
//! Each socket gets a reader and a writer task. The writer only ever drains
//! its own queue, so a slow client never blocks a room.
//!
//! # Components
//!
//! - [`messages`] - wire protocol types
//! - [`handler`] - axum upgrade handler and frame dispatch

pub mod handler;
pub mod messages;

pub use handler::ws_handler;
pub use messages::{ClientMessage, ServerMessage};

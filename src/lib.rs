//! Chat Relay - realtime group chat fan-out with presence and moderation
//!
//! This crate relays chat messages between WebSocket clients grouped into
//! rooms, tracks who is online in each room, and enforces a strike-based
//! banned-word policy with temporary mutes. Message storage and the
//! moderation lists belong to an external REST service.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

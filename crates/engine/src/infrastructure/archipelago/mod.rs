//! Archipelago websocket adapter.

mod address;
mod client;
mod pending;

pub use address::{candidate_urls, DEFAULT_PORT};
pub use client::{ArchipelagoSession, WebSocketConnector};

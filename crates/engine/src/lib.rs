//! ApBridge Engine library.
//!
//! Bridges a game's chat feed to an Archipelago multiworld session: obtained-item
//! lines earn tokens, tokens buy hints.
//!
//! ## Structure
//!
//! - `use_cases/` - session lifecycle, reward pipeline, hint purchases
//! - `infrastructure/` - port traits, the Archipelago websocket adapter, configuration
//! - `api/` - console entry point
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod use_cases;

/// Shared test doubles.
#[cfg(test)]
pub mod test_fixtures;

pub use app::App;

//! Session use cases.
//!
//! Owns the connection to the Archipelago server and everything that only exists while
//! it is up: the token balance and the known-hint set.

mod manager;
mod state;

pub use manager::{
    ConnectionError, SessionError, SessionManager, SessionSnapshot, CONNECTION_LOST_NOTICE,
    NOT_CONNECTED_NOTICE,
};
pub use state::{ConnectionState, ConnectionStateObserver};

//! Session connection state and a lock-free view of it.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Connection state of the Archipelago session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected to the server
    #[default]
    Disconnected,
    /// Login in flight
    Connecting,
    /// Logged in; balance and hint feed are live
    Connected,
}

impl ConnectionState {
    /// Convert to u8 for atomic storage.
    pub fn to_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Connected => 2,
        }
    }

    /// Convert from u8 (atomic storage).
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        };
        f.write_str(label)
    }
}

/// Read-only view of the session state that never waits on the session lock.
///
/// The chat ingestion path runs synchronously inside the host's event callback, so it
/// checks the connection through this instead of awaiting the session manager.
#[derive(Clone)]
pub struct ConnectionStateObserver {
    state: Arc<AtomicU8>,
}

impl ConnectionStateObserver {
    pub fn new(state: Arc<AtomicU8>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
}

/// Store a new connection state in the shared atomic.
pub(crate) fn set_connection_state(state_ref: &AtomicU8, new_state: ConnectionState) {
    state_ref.store(new_state.to_u8(), Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_values_read_as_disconnected() {
        assert_eq!(ConnectionState::from_u8(2), ConnectionState::Connected);
        assert_eq!(ConnectionState::from_u8(200), ConnectionState::Disconnected);
    }

    #[test]
    fn observer_tracks_shared_state() {
        let state = Arc::new(AtomicU8::new(ConnectionState::Disconnected.to_u8()));
        let observer = ConnectionStateObserver::new(Arc::clone(&state));
        assert!(!observer.is_connected());

        set_connection_state(&state, ConnectionState::Connected);
        assert!(observer.is_connected());

        let cloned = observer.clone();
        set_connection_state(&state, ConnectionState::Connecting);
        assert_eq!(cloned.state(), ConnectionState::Connecting);
    }
}

//! Error types for port operations.

/// Failures talking to the Archipelago server.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The address could not be turned into a websocket URL.
    #[error("Invalid server address '{0}'")]
    InvalidAddress(String),

    /// No candidate URL accepted the websocket handshake.
    #[error("Could not connect to {url}: {message}")]
    Connect { url: String, message: String },

    /// The server did not answer within the configured window.
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    /// The socket failed after the handshake.
    #[error("Websocket error: {0}")]
    Socket(String),

    /// The socket closed or the session was shut down.
    #[error("Connection closed")]
    Closed,

    /// The server sent something the client cannot use.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl TransportError {
    pub fn connect(url: impl ToString, message: impl ToString) -> Self {
        Self::Connect {
            url: url.to_string(),
            message: message.to_string(),
        }
    }

    pub fn socket(message: impl ToString) -> Self {
        Self::Socket(message.to_string())
    }

    pub fn protocol(message: impl ToString) -> Self {
        Self::Protocol(message.to_string())
    }
}

impl From<apbridge_shared::ProtocolError> for TransportError {
    fn from(err: apbridge_shared::ProtocolError) -> Self {
        Self::protocol(err)
    }
}

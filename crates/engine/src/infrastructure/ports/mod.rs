//! Port traits for infrastructure boundaries.
//!
//! Use cases depend on these, adapters implement them.

mod error;
mod host;
mod remote;
mod testing;

pub use error::TransportError;
pub use host::HostChat;
pub use remote::{
    client_version, LoginFailure, LoginOutcome, LoginRequest, RemoteConnector, RemoteEvent,
    RemoteEventSender, RemoteSession, CLIENT_TAGS,
};
pub use testing::RandomPort;

#[cfg(test)]
pub use remote::{MockRemoteConnector, MockRemoteSession};
#[cfg(test)]
pub use testing::MockRandomPort;

//! Ports onto the Archipelago multiworld server.
//!
//! The session manager only sees these traits. The websocket adapter in
//! `infrastructure::archipelago` implements them against a live server, and tests use
//! the mockall-generated doubles.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use apbridge_domain::{Hint, LocationId, SlotId};
use apbridge_shared::{
    ConnectionRefusedReason, NetworkVersion, PrintMessage, ITEMS_HANDLING_INCLUDE_OWN,
};

use super::error::TransportError;

/// Protocol version announced in the Connect packet.
pub fn client_version() -> NetworkVersion {
    NetworkVersion::new(0, 6, 4)
}

/// Tags announced in the Connect packet. `TextOnly` and `HintGenerator` tell the server
/// this client neither plays a game nor sends location checks.
pub const CLIENT_TAGS: [&str; 4] = ["AP", "FFXIV", "HintGenerator", "TextOnly"];

/// Everything the server needs to admit a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub slot: String,
    pub password: Option<String>,
    pub game: String,
    pub version: NetworkVersion,
    pub tags: Vec<String>,
    pub items_handling: u8,
    pub request_slot_data: bool,
}

impl LoginRequest {
    pub fn new(slot: impl Into<String>, password: Option<&str>) -> Self {
        Self {
            slot: slot.into(),
            password: password.filter(|p| !p.is_empty()).map(str::to_string),
            game: String::new(),
            version: client_version(),
            tags: CLIENT_TAGS.iter().map(|t| t.to_string()).collect(),
            items_handling: ITEMS_HANDLING_INCLUDE_OWN,
            request_slot_data: true,
        }
    }
}

/// Why a login did not produce a session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LoginFailure {
    pub errors: Vec<String>,
    pub codes: Vec<ConnectionRefusedReason>,
}

impl LoginFailure {
    /// Build from the server's ConnectionRefused error codes.
    pub fn from_refusal(raw: &[String]) -> Self {
        let codes: Vec<_> = raw
            .iter()
            .filter_map(|code| ConnectionRefusedReason::from_code(code))
            .collect();
        let errors = if codes.len() == raw.len() && !codes.is_empty() {
            codes.iter().map(|c| c.description().to_string()).collect()
        } else {
            raw.to_vec()
        };
        Self { errors, codes }
    }

    /// A failure with a single message and no codes, e.g. a socket error mid-login.
    pub fn from_error(message: impl ToString) -> Self {
        Self {
            errors: vec![message.to_string()],
            codes: Vec::new(),
        }
    }

    /// Player-facing text: each error on its own line, then the raw codes.
    pub fn message(&self) -> String {
        let mut lines = if self.errors.is_empty() {
            vec!["Connection refused by server.".to_string()]
        } else {
            self.errors.clone()
        };
        lines.extend(self.codes.iter().map(|c| c.code().to_string()));
        lines.join("\n")
    }
}

pub enum LoginOutcome {
    Accepted(Arc<dyn RemoteSession>),
    Refused(LoginFailure),
}

impl std::fmt::Debug for LoginOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accepted(session) => f
                .debug_struct("Accepted")
                .field("slot", &session.slot())
                .finish(),
            Self::Refused(failure) => f.debug_tuple("Refused").field(failure).finish(),
        }
    }
}

/// Unsolicited traffic from a live session.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteEvent {
    /// Full contents of the slot's hint feed.
    HintsUpdated(Vec<Hint>),
    /// The socket failed or closed without being asked to.
    TransportError(String),
    /// A server print addressed to every client.
    Print(PrintMessage),
}

pub type RemoteEventSender = mpsc::UnboundedSender<RemoteEvent>;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteConnector: Send + Sync {
    /// Open a socket to `host`, perform the handshake and return the admitted session.
    ///
    /// A refusal by the server is `Ok(LoginOutcome::Refused)`; `Err` is reserved for
    /// transport failures before the server could answer.
    async fn login(
        &self,
        host: &str,
        request: LoginRequest,
        events: RemoteEventSender,
    ) -> Result<LoginOutcome, TransportError>;
}

/// A logged-in slot. Counter keys are scoped to the slot by the implementation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteSession: Send + Sync {
    fn slot(&self) -> SlotId;
    fn player_alias(&self, slot: SlotId) -> Option<String>;
    fn missing_locations(&self) -> BTreeSet<LocationId>;

    /// Create the counter with `default` if the server has no value yet.
    async fn initialize_counter(&self, key: &str, default: i64) -> Result<(), TransportError>;
    async fn read_counter(&self, key: &str) -> Result<i64, TransportError>;
    async fn write_counter(&self, key: &str, value: i64) -> Result<(), TransportError>;

    /// Subscribe to the slot's hint feed. Updates arrive as `RemoteEvent::HintsUpdated`.
    async fn track_hints(&self) -> Result<(), TransportError>;
    async fn scout_as_hint(&self, location: LocationId) -> Result<(), TransportError>;
    async fn say(&self, text: &str) -> Result<(), TransportError>;
    async fn close(&self) -> Result<(), TransportError>;
}

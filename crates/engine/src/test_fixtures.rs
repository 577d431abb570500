//! Shared test doubles for the engine's use cases.
//!
//! Mock ports come from mockall (`Mock*` re-exported by `infrastructure::ports`); the
//! helpers here cover the recurring setup: a host chat that records what was printed,
//! a live config, and a remote session that completes the login handshake.

use std::sync::{Arc, Mutex, PoisonError};

use apbridge_domain::{ChannelId, SlotId};

use crate::infrastructure::config::{BridgeConfig, LiveConfig};
use crate::infrastructure::ports::{
    HostChat, LoginOutcome, MockRemoteConnector, MockRemoteSession, RemoteEventSender,
};

// =============================================================================
// Host chat
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatLine {
    Print(ChannelId, String),
    Notice(String),
    Error(String),
}

/// Host chat that keeps every line for later assertions.
#[derive(Debug, Default)]
pub struct RecordingChat {
    lines: Mutex<Vec<ChatLine>>,
}

impl RecordingChat {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lines(&self) -> Vec<ChatLine> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn prints(&self) -> Vec<(ChannelId, String)> {
        self.lines()
            .into_iter()
            .filter_map(|line| match line {
                ChatLine::Print(channel, text) => Some((channel, text)),
                _ => None,
            })
            .collect()
    }

    pub fn notices(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter_map(|line| match line {
                ChatLine::Notice(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter_map(|line| match line {
                ChatLine::Error(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    fn push(&self, line: ChatLine) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }
}

impl HostChat for RecordingChat {
    fn print(&self, channel: ChannelId, text: &str) {
        self.push(ChatLine::Print(channel, text.to_string()));
    }

    fn notice(&self, text: &str) {
        self.push(ChatLine::Notice(text.to_string()));
    }

    fn error(&self, text: &str) {
        self.push(ChatLine::Error(text.to_string()));
    }
}

// =============================================================================
// Config
// =============================================================================

pub fn live_config(config: BridgeConfig) -> Arc<LiveConfig> {
    Arc::new(LiveConfig::new(config))
}

// =============================================================================
// Remote server
// =============================================================================

/// A remote session that accepts the login handshake for `slot` with `balance` stored.
///
/// `close` is left unset so tests state how often they expect teardown.
pub fn handshake_session(slot: i32, balance: i64) -> MockRemoteSession {
    let mut remote = MockRemoteSession::new();
    remote.expect_slot().return_const(SlotId::new(slot));
    remote
        .expect_initialize_counter()
        .returning(|_, _| Ok(()));
    remote
        .expect_read_counter()
        .returning(move |_| Ok(balance));
    remote.expect_track_hints().returning(|| Ok(()));
    remote
}

/// Captures the push-event sender the session manager hands to the connector.
#[derive(Clone, Default)]
pub struct EventTap {
    sender: Arc<Mutex<Option<RemoteEventSender>>>,
}

impl EventTap {
    pub fn sender(&self) -> RemoteEventSender {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .expect("login has not happened yet")
    }
}

/// A connector whose single login admits `remote`.
pub fn connector_for(remote: MockRemoteSession) -> (MockRemoteConnector, EventTap) {
    let tap = EventTap::default();
    let captured = tap.clone();
    let mut connector = MockRemoteConnector::new();
    connector
        .expect_login()
        .times(1)
        .return_once(move |_, _, events| {
            *captured
                .sender
                .lock()
                .unwrap_or_else(PoisonError::into_inner) = Some(events);
            Ok(LoginOutcome::Accepted(Arc::new(remote)))
        });
    (connector, tap)
}

//! The single owner of the Archipelago session.
//!
//! Every state transition goes through one async lock and bumps an epoch counter. Work
//! that has to wait on the network (login, close) runs outside the lock and re-checks the
//! epoch afterwards, so a `disconnect` racing a `connect` or a transport drop always wins
//! cleanly and only one caller tears a session down.

use std::collections::BTreeSet;
use std::sync::atomic::AtomicU8;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use apbridge_domain::{group_thousands, Hint, KnownHints, LocationId};
use apbridge_shared::PrintMessage;

use super::state::{set_connection_state, ConnectionState, ConnectionStateObserver};
use crate::infrastructure::config::ConfigSource;
use crate::infrastructure::ports::{
    HostChat, LoginFailure, LoginOutcome, LoginRequest, RemoteConnector, RemoteEvent,
    RemoteSession, TransportError,
};
use crate::use_cases::display::ServerMessageFilter;
use crate::use_cases::rewards::TokenSink;

pub const CONNECTION_LOST_NOTICE: &str = "Connection lost, please sign back in.";
pub const NOT_CONNECTED_NOTICE: &str = "You are not connected to a server.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    /// Login failed; the message is what the player was shown.
    #[error("{message}")]
    Refused { message: String },

    #[error("Session is already {0}")]
    AlreadyActive(ConnectionState),

    #[error("Connection attempt was cancelled by a disconnect")]
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Not connected to a server")]
    NotConnected,

    #[error("Insufficient balance: have {balance}, need {cost}")]
    InsufficientBalance { balance: u64, cost: u64 },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Point-in-time view of the session for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    pub host: Option<String>,
    pub slot: Option<String>,
    pub balance: u64,
    pub known_hints: KnownHints,
}

struct ActiveSession {
    remote: Arc<dyn RemoteSession>,
    host: String,
    slot_name: String,
    balance: u64,
    known_hints: KnownHints,
    /// Stops the push-event pump.
    feeds: CancellationToken,
}

#[derive(Default)]
struct SessionInner {
    state: ConnectionState,
    epoch: u64,
    active: Option<ActiveSession>,
}

/// Owns the connection, the token balance and the known-hint set.
#[derive(Clone)]
pub struct SessionManager {
    connector: Arc<dyn RemoteConnector>,
    chat: Arc<dyn HostChat>,
    config: Arc<dyn ConfigSource>,
    inner: Arc<Mutex<SessionInner>>,
    state: Arc<AtomicU8>,
    /// Serializes read-modify-write of the balance with its remote write.
    ledger: Arc<Mutex<()>>,
}

impl SessionManager {
    pub fn new(
        connector: Arc<dyn RemoteConnector>,
        chat: Arc<dyn HostChat>,
        config: Arc<dyn ConfigSource>,
    ) -> Self {
        Self {
            connector,
            chat,
            config,
            inner: Arc::new(Mutex::new(SessionInner::default())),
            state: Arc::new(AtomicU8::new(ConnectionState::Disconnected.to_u8())),
            ledger: Arc::new(Mutex::new(())),
        }
    }

    pub fn observer(&self) -> ConnectionStateObserver {
        ConnectionStateObserver::new(Arc::clone(&self.state))
    }

    pub fn state(&self) -> ConnectionState {
        self.observer().state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    fn set_state(&self, inner: &mut SessionInner, new_state: ConnectionState) {
        inner.state = new_state;
        set_connection_state(&self.state, new_state);
    }

    pub async fn connect(
        &self,
        host: &str,
        slot: &str,
        password: Option<&str>,
    ) -> Result<(), ConnectionError> {
        let epoch = {
            let mut inner = self.inner.lock().await;
            if inner.state != ConnectionState::Disconnected {
                return Err(ConnectionError::AlreadyActive(inner.state));
            }
            inner.epoch += 1;
            self.set_state(&mut inner, ConnectionState::Connecting);
            inner.epoch
        };

        tracing::info!(host, slot, "Connecting to Archipelago server");
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let request = LoginRequest::new(slot, password);

        let remote = match self.connector.login(host, request, events_tx).await {
            Ok(LoginOutcome::Accepted(remote)) => remote,
            Ok(LoginOutcome::Refused(failure)) => {
                return Err(self.abort_connect(epoch, failure).await);
            }
            Err(e) => {
                return Err(self.abort_connect(epoch, LoginFailure::from_error(e)).await);
            }
        };

        let token_key = self.config.current().economy.token_key.clone();
        let balance = match prepare_session(remote.as_ref(), &token_key).await {
            Ok(balance) => balance,
            Err(e) => {
                self.close_quietly(remote.as_ref()).await;
                return Err(self.abort_connect(epoch, LoginFailure::from_error(e)).await);
            }
        };

        let feeds = CancellationToken::new();
        {
            let mut inner = self.inner.lock().await;
            if inner.epoch != epoch {
                drop(inner);
                tracing::info!(host, slot, "Discarding superseded connection");
                self.close_quietly(remote.as_ref()).await;
                return Err(ConnectionError::Superseded);
            }
            inner.active = Some(ActiveSession {
                remote,
                host: host.to_string(),
                slot_name: slot.to_string(),
                balance,
                known_hints: KnownHints::new(),
                feeds: feeds.clone(),
            });
            self.set_state(&mut inner, ConnectionState::Connected);
        }

        self.spawn_event_pump(epoch, events_rx, feeds);
        tracing::info!(host, slot, balance, "Connected to Archipelago server");
        self.chat.notice(&format!(
            "Connected to Archipelago session at {host} as {slot}."
        ));
        Ok(())
    }

    async fn abort_connect(&self, epoch: u64, failure: LoginFailure) -> ConnectionError {
        {
            let mut inner = self.inner.lock().await;
            if inner.epoch == epoch {
                self.set_state(&mut inner, ConnectionState::Disconnected);
            }
        }
        let message = failure.message();
        tracing::warn!("Login failed: {}", message.replace('\n', "; "));
        self.chat.error(&message);
        ConnectionError::Refused { message }
    }

    /// Close the session if there is one. Never fails.
    pub async fn disconnect(&self) {
        let active = {
            let mut inner = self.inner.lock().await;
            if inner.state == ConnectionState::Disconnected {
                return;
            }
            inner.epoch += 1;
            self.set_state(&mut inner, ConnectionState::Disconnected);
            inner.active.take()
        };

        match active {
            Some(active) => {
                tracing::info!(host = %active.host, "Disconnecting from Archipelago server");
                self.teardown(active).await;
            }
            None => tracing::info!("Cancelled connection attempt"),
        }
    }

    async fn teardown(&self, active: ActiveSession) {
        active.feeds.cancel();
        self.close_quietly(active.remote.as_ref()).await;
    }

    async fn close_quietly(&self, remote: &dyn RemoteSession) {
        let grace = self.config.current().connection.close_grace();
        match tokio::time::timeout(grace, remote.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::debug!("Ignoring close error: {}", e),
            Err(_) => tracing::debug!("Close did not finish within {:?}", grace),
        }
    }

    fn spawn_event_pump(
        &self,
        epoch: u64,
        mut events: mpsc::UnboundedReceiver<RemoteEvent>,
        feeds: CancellationToken,
    ) {
        let manager = self.clone();
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    biased;
                    _ = feeds.cancelled() => break,
                    event = events.recv() => event,
                };
                match event {
                    Some(RemoteEvent::HintsUpdated(hints)) => {
                        manager.on_hints_updated(epoch, &hints).await;
                    }
                    Some(RemoteEvent::Print(message)) => manager.on_print(epoch, &message).await,
                    Some(RemoteEvent::TransportError(reason)) => {
                        manager.on_transport_error(epoch, &reason).await;
                        break;
                    }
                    None => break,
                }
            }
            tracing::debug!(epoch, "Session event pump stopped");
        });
    }

    async fn on_transport_error(&self, epoch: u64, reason: &str) {
        let active = {
            let mut inner = self.inner.lock().await;
            if inner.epoch != epoch || inner.state != ConnectionState::Connected {
                return;
            }
            inner.epoch += 1;
            self.set_state(&mut inner, ConnectionState::Disconnected);
            inner.active.take()
        };

        tracing::error!("Lost Archipelago session: {}", reason);
        if let Some(active) = active {
            self.teardown(active).await;
        }
        self.chat.error(CONNECTION_LOST_NOTICE);
    }

    async fn on_hints_updated(&self, epoch: u64, hints: &[Hint]) {
        let mut inner = self.inner.lock().await;
        if inner.epoch != epoch {
            return;
        }
        if let Some(active) = inner.active.as_mut() {
            active.known_hints = KnownHints::from_feed(hints, active.remote.slot());
            tracing::debug!(
                received = hints.len(),
                known = active.known_hints.len(),
                "Hint feed updated"
            );
        }
    }

    async fn on_print(&self, epoch: u64, message: &PrintMessage) {
        let remote = {
            let inner = self.inner.lock().await;
            if inner.epoch != epoch {
                return;
            }
            match inner.active.as_ref() {
                Some(active) => Arc::clone(&active.remote),
                None => return,
            }
        };

        let config = self.config.current();
        let filter = ServerMessageFilter::new(&config.display, remote.slot());
        if let Some(text) = filter.render(message, |slot| remote.player_alias(slot)) {
            self.chat.notice(&text);
        }
    }

    /// Add to the balance and persist it. Dropped when not connected.
    pub async fn deposit(&self, amount: u64) {
        let _ledger = self.ledger.lock().await;
        let (remote, total) = {
            let mut inner = self.inner.lock().await;
            if inner.state != ConnectionState::Connected {
                tracing::debug!(amount, "Dropping deposit while disconnected");
                return;
            }
            let Some(active) = inner.active.as_mut() else {
                return;
            };
            active.balance = active.balance.saturating_add(amount);
            (Arc::clone(&active.remote), active.balance)
        };

        tracing::debug!(amount, total, "Deposited tokens");
        self.persist_balance(remote.as_ref(), total).await;
    }

    /// Scout `location` as a hint and charge `cost` for it. Returns the new balance.
    ///
    /// The balance check, the request and the debit happen under the ledger lock, so
    /// no deposit interleaves and nothing is charged unless the request was sent.
    pub async fn purchase_hint(
        &self,
        cost: u64,
        location: LocationId,
    ) -> Result<u64, SessionError> {
        let _ledger = self.ledger.lock().await;
        let (remote, epoch, balance) = {
            let inner = self.inner.lock().await;
            let active = match (inner.state, inner.active.as_ref()) {
                (ConnectionState::Connected, Some(active)) => active,
                _ => return Err(SessionError::NotConnected),
            };
            if active.balance < cost {
                return Err(SessionError::InsufficientBalance {
                    balance: active.balance,
                    cost,
                });
            }
            (Arc::clone(&active.remote), inner.epoch, active.balance)
        };

        send_scout(remote.as_ref(), location).await?;

        let total = balance - cost;
        {
            let mut inner = self.inner.lock().await;
            if inner.epoch == epoch {
                if let Some(active) = inner.active.as_mut() {
                    active.balance = total;
                }
            }
        }
        tracing::info!(
            "Spent {} tokens, {} remaining",
            group_thousands(cost),
            group_thousands(total)
        );
        self.persist_balance(remote.as_ref(), total).await;
        Ok(total)
    }

    async fn persist_balance(&self, remote: &dyn RemoteSession, total: u64) {
        let key = self.config.current().economy.token_key.clone();
        let value = i64::try_from(total).unwrap_or(i64::MAX);
        if let Err(e) = remote.write_counter(&key, value).await {
            tracing::warn!("Failed to persist token balance {}: {}", total, e);
        }
    }

    /// Ask the server to reveal `location` as a hint.
    pub async fn request_hint(&self, location: LocationId) -> Result<(), SessionError> {
        let remote = self.connected_remote().await?;
        send_scout(remote.as_ref(), location).await
    }

    /// Forward player-typed text to the multiworld chat.
    pub async fn send_chat(&self, text: &str) -> Result<(), SessionError> {
        let remote = match self.connected_remote().await {
            Ok(remote) => remote,
            Err(e) => {
                self.chat.error(NOT_CONNECTED_NOTICE);
                return Err(e);
            }
        };
        if let Err(e) = remote.say(text).await {
            tracing::warn!("Failed to send chat message: {}", e);
            return Err(e.into());
        }
        Ok(())
    }

    pub async fn missing_locations(&self) -> BTreeSet<LocationId> {
        match self.connected_remote().await {
            Ok(remote) => remote.missing_locations(),
            Err(_) => BTreeSet::new(),
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().await;
        match inner.active.as_ref() {
            Some(active) => SessionSnapshot {
                state: inner.state,
                host: Some(active.host.clone()),
                slot: Some(active.slot_name.clone()),
                balance: active.balance,
                known_hints: active.known_hints.clone(),
            },
            None => SessionSnapshot {
                state: inner.state,
                ..SessionSnapshot::default()
            },
        }
    }

    async fn connected_remote(&self) -> Result<Arc<dyn RemoteSession>, SessionError> {
        let inner = self.inner.lock().await;
        match (inner.state, inner.active.as_ref()) {
            (ConnectionState::Connected, Some(active)) => Ok(Arc::clone(&active.remote)),
            _ => Err(SessionError::NotConnected),
        }
    }
}

async fn send_scout(remote: &dyn RemoteSession, location: LocationId) -> Result<(), SessionError> {
    remote.scout_as_hint(location).await?;
    tracing::info!(%location, "Requested hint");
    Ok(())
}

/// Create the counter if needed, read the balance and subscribe to hints.
async fn prepare_session(
    remote: &dyn RemoteSession,
    token_key: &str,
) -> Result<u64, TransportError> {
    remote.initialize_counter(token_key, 0).await?;
    let stored = remote.read_counter(token_key).await?;
    remote.track_hints().await?;
    Ok(u64::try_from(stored).unwrap_or(0))
}

#[async_trait]
impl TokenSink for SessionManager {
    async fn deposit(&self, amount: u64) {
        SessionManager::deposit(self, amount).await;
    }
}

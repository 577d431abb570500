//! Websocket client for an Archipelago server using tokio-tungstenite.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use url::Url;
use uuid::Uuid;

use apbridge_domain::{LocationId, SlotId, TeamId};
use apbridge_shared::{
    decode_frame, encode_frame, hints_key, parse_hints, slot_scoped_key, ClientPacket,
    DataStorageOperation, NetworkPlayer, PrintMessage, ServerPacket,
};

use super::address::candidate_urls;
use super::pending::PendingReplies;
use crate::infrastructure::config::ConnectionConfig;
use crate::infrastructure::ports::{
    LoginFailure, LoginOutcome, LoginRequest, RemoteConnector, RemoteEvent, RemoteEventSender,
    RemoteSession, TransportError,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Opens sessions against a live server.
pub struct WebSocketConnector {
    connect_timeout: Duration,
    request_timeout: Duration,
    close_grace: Duration,
}

impl WebSocketConnector {
    pub fn new(
        connect_timeout: Duration,
        request_timeout: Duration,
        close_grace: Duration,
    ) -> Self {
        Self {
            connect_timeout,
            request_timeout,
            close_grace,
        }
    }

    pub fn from_config(config: &ConnectionConfig) -> Self {
        Self::new(
            config.connect_timeout(),
            config.request_timeout(),
            config.close_grace(),
        )
    }

    async fn open(&self, host: &str) -> Result<(Url, WsStream), TransportError> {
        let mut last_error = TransportError::InvalidAddress(host.to_string());
        for url in candidate_urls(host)? {
            match timeout(self.connect_timeout, connect_async(url.as_str())).await {
                Ok(Ok((stream, _))) => {
                    tracing::debug!("Opened websocket to {}", url);
                    return Ok((url, stream));
                }
                Ok(Err(e)) => {
                    tracing::debug!("Websocket handshake with {} failed: {}", url, e);
                    last_error = TransportError::connect(&url, e);
                }
                Err(_) => {
                    tracing::debug!("Websocket handshake with {} timed out", url);
                    last_error = TransportError::connect(&url, "handshake timed out");
                }
            }
        }
        Err(last_error)
    }
}

#[async_trait]
impl RemoteConnector for WebSocketConnector {
    async fn login(
        &self,
        host: &str,
        request: LoginRequest,
        events: RemoteEventSender,
    ) -> Result<LoginOutcome, TransportError> {
        let (url, mut stream) = self.open(host).await?;

        let admission = timeout(self.connect_timeout, handshake(&mut stream, &request))
            .await
            .map_err(|_| TransportError::Timeout("login reply"))??;

        match admission {
            Admission::Refused(errors) => {
                tracing::warn!("Server at {} refused slot {}: {:?}", url, request.slot, errors);
                let _ = stream.close(None).await;
                Ok(LoginOutcome::Refused(LoginFailure::from_refusal(&errors)))
            }
            Admission::Connected {
                team,
                slot,
                players,
                missing,
            } => {
                tracing::info!(%team, %slot, "Logged in to {} as {}", url, request.slot);
                let session = ArchipelagoSession::start(
                    stream,
                    SessionShared::new(team, slot, &players, missing, events),
                    self.request_timeout,
                    self.close_grace,
                );
                Ok(LoginOutcome::Accepted(Arc::new(session)))
            }
        }
    }
}

enum Admission {
    Connected {
        team: TeamId,
        slot: SlotId,
        players: Vec<NetworkPlayer>,
        missing: Vec<i64>,
    },
    Refused(Vec<String>),
}

/// RoomInfo, Connect, then Connected or ConnectionRefused.
async fn handshake(
    stream: &mut WsStream,
    request: &LoginRequest,
) -> Result<Admission, TransportError> {
    loop {
        let packets = next_packets(stream).await?;
        if packets
            .iter()
            .any(|p| matches!(p, ServerPacket::RoomInfo { .. }))
        {
            break;
        }
    }

    let frame = encode_frame(&[connect_packet(request)])?;
    stream
        .send(Message::Text(frame))
        .await
        .map_err(TransportError::socket)?;

    loop {
        for packet in next_packets(stream).await? {
            match packet {
                ServerPacket::Connected {
                    team,
                    slot,
                    players,
                    missing_locations,
                    ..
                } => {
                    return Ok(Admission::Connected {
                        team: TeamId::new(team),
                        slot: SlotId::new(slot),
                        players,
                        missing: missing_locations,
                    })
                }
                ServerPacket::ConnectionRefused { errors } => {
                    return Ok(Admission::Refused(errors));
                }
                ServerPacket::InvalidPacket { text, .. } => {
                    return Err(TransportError::protocol(text));
                }
                _ => {}
            }
        }
    }
}

async fn next_packets(stream: &mut WsStream) -> Result<Vec<ServerPacket>, TransportError> {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return Ok(decode_frame(&text)?),
            Some(Ok(Message::Close(_))) | None => return Err(TransportError::Closed),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(TransportError::socket(e)),
        }
    }
}

fn connect_packet(request: &LoginRequest) -> ClientPacket {
    ClientPacket::Connect {
        password: request.password.clone().unwrap_or_default(),
        game: request.game.clone(),
        name: request.slot.clone(),
        uuid: Uuid::new_v4().to_string(),
        version: request.version.clone(),
        items_handling: request.items_handling,
        tags: request.tags.clone(),
        slot_data: request.request_slot_data,
    }
}

// =============================================================================
// Live session
// =============================================================================

enum Outbound {
    Packets(Vec<ClientPacket>),
    Close,
}

/// State shared between the session handle and its reader task.
struct SessionShared {
    team: TeamId,
    slot: SlotId,
    hints_key: String,
    players: RwLock<HashMap<SlotId, String>>,
    missing: RwLock<BTreeSet<LocationId>>,
    pending: Mutex<PendingReplies>,
    /// Set once `close` is called so the reader stays quiet about the shutdown.
    closing: AtomicBool,
    /// Cancelled by `close`; the reader gives the server one grace period after it.
    close_requested: CancellationToken,
    events: RemoteEventSender,
}

impl SessionShared {
    fn new(
        team: TeamId,
        slot: SlotId,
        players: &[NetworkPlayer],
        missing: Vec<i64>,
        events: RemoteEventSender,
    ) -> Self {
        Self {
            team,
            slot,
            hints_key: hints_key(team, slot),
            players: RwLock::new(alias_table(team, players)),
            missing: RwLock::new(missing.into_iter().map(LocationId::new).collect()),
            pending: Mutex::new(PendingReplies::default()),
            closing: AtomicBool::new(false),
            close_requested: CancellationToken::new(),
            events,
        }
    }

    async fn dispatch(&self, packet: ServerPacket) {
        match packet {
            ServerPacket::Retrieved { keys, request_id } => {
                if let Some(value) = keys.get(&self.hints_key) {
                    self.publish_hints(value);
                }
                if let Some(request_id) = request_id {
                    if !self.pending.lock().await.resolve(&request_id, keys) {
                        tracing::debug!("Retrieved reply for unknown request {}", request_id);
                    }
                }
            }
            ServerPacket::SetReply { key, value, .. } if key == self.hints_key => {
                self.publish_hints(&value);
            }
            ServerPacket::RoomUpdate {
                checked_locations,
                players,
            } => {
                if !checked_locations.is_empty() {
                    let mut missing = self.missing.write().unwrap_or_else(PoisonError::into_inner);
                    for location in checked_locations {
                        missing.remove(&LocationId::new(location));
                    }
                }
                if let Some(players) = players {
                    *self.players.write().unwrap_or_else(PoisonError::into_inner) =
                        alias_table(self.team, &players);
                }
            }
            packet @ ServerPacket::PrintJson { .. } => {
                if let Some(message) = PrintMessage::from_packet(packet) {
                    let _ = self.events.send(RemoteEvent::Print(message));
                }
            }
            ServerPacket::InvalidPacket {
                kind,
                original_cmd,
                text,
            } => {
                tracing::warn!(
                    "Server rejected {} packet ({}): {}",
                    original_cmd.as_deref().unwrap_or("unknown"),
                    kind,
                    text
                );
            }
            _ => {}
        }
    }

    fn publish_hints(&self, value: &Value) {
        match parse_hints(value) {
            Ok(hints) => {
                let _ = self.events.send(RemoteEvent::HintsUpdated(hints));
            }
            Err(e) => tracing::warn!("Ignoring malformed hint feed: {}", e),
        }
    }
}

fn alias_table(team: TeamId, players: &[NetworkPlayer]) -> HashMap<SlotId, String> {
    players
        .iter()
        .filter(|p| p.team == team.get())
        .map(|p| {
            let alias = if p.alias.is_empty() { &p.name } else { &p.alias };
            (SlotId::new(p.slot), alias.clone())
        })
        .collect()
}

/// Socket tasks of one session. Dropping them aborts both.
struct SocketTasks {
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl SocketTasks {
    /// Wait for both halves to finish, up to `grace` in total.
    async fn finish(mut self, grace: Duration) {
        let deadline = Instant::now() + grace;
        if timeout_at(deadline, &mut self.writer).await.is_err() {
            tracing::debug!("Close frame not flushed within {:?}", grace);
        }
        if timeout_at(deadline, &mut self.reader).await.is_err() {
            tracing::debug!("Server did not finish the close handshake within {:?}", grace);
        }
    }
}

impl Drop for SocketTasks {
    fn drop(&mut self) {
        self.writer.abort();
        self.reader.abort();
    }
}

/// A logged-in slot backed by a websocket.
pub struct ArchipelagoSession {
    shared: Arc<SessionShared>,
    outbound: mpsc::Sender<Outbound>,
    tasks: Mutex<Option<SocketTasks>>,
    next_request: AtomicU64,
    request_timeout: Duration,
    close_grace: Duration,
}

impl ArchipelagoSession {
    fn start(
        stream: WsStream,
        shared: SessionShared,
        request_timeout: Duration,
        close_grace: Duration,
    ) -> Self {
        let shared = Arc::new(shared);
        let (write, read) = stream.split();
        let (tx, rx) = mpsc::channel::<Outbound>(32);

        let tasks = SocketTasks {
            writer: tokio::spawn(write_loop(write, rx)),
            reader: tokio::spawn(read_loop(read, Arc::clone(&shared), close_grace)),
        };

        Self {
            shared,
            outbound: tx,
            tasks: Mutex::new(Some(tasks)),
            next_request: AtomicU64::new(1),
            request_timeout,
            close_grace,
        }
    }

    async fn send(&self, packets: Vec<ClientPacket>) -> Result<(), TransportError> {
        if self.shared.closing.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.outbound
            .send(Outbound::Packets(packets))
            .await
            .map_err(|_| TransportError::Closed)
    }

    async fn get_value(&self, key: String) -> Result<Value, TransportError> {
        let request_id = format!(
            "apbridge-{}",
            self.next_request.fetch_add(1, Ordering::Relaxed)
        );
        let (tx, rx) = oneshot::channel();
        self.shared
            .pending
            .lock()
            .await
            .insert(request_id.clone(), tx);

        let get = ClientPacket::Get {
            keys: vec![key.clone()],
            request_id: Some(request_id.clone()),
        };
        if let Err(e) = self.send(vec![get]).await {
            self.shared.pending.lock().await.remove(&request_id);
            return Err(e);
        }

        match timeout(self.request_timeout, rx).await {
            Ok(Ok(mut keys)) => Ok(keys.remove(&key).unwrap_or(Value::Null)),
            Ok(Err(_)) => Err(TransportError::Closed),
            Err(_) => {
                self.shared.pending.lock().await.remove(&request_id);
                Err(TransportError::Timeout("Retrieved"))
            }
        }
    }

    fn set_packet(&self, key: &str, default: i64, operation: DataStorageOperation) -> ClientPacket {
        ClientPacket::Set {
            key: slot_scoped_key(self.shared.slot, key),
            default: Value::from(default),
            want_reply: false,
            operations: vec![operation],
        }
    }
}

async fn write_loop(mut write: SplitSink<WsStream, Message>, mut rx: mpsc::Receiver<Outbound>) {
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Packets(packets) => {
                let frame = match encode_frame(&packets) {
                    Ok(frame) => frame,
                    Err(e) => {
                        tracing::error!("Failed to encode packets: {}", e);
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(frame)).await {
                    tracing::error!("Failed to send packets: {}", e);
                    break;
                }
            }
            Outbound::Close => {
                if let Err(e) = write.close().await {
                    tracing::debug!("Websocket close failed: {}", e);
                }
                break;
            }
        }
    }
}

async fn read_loop(
    mut read: SplitStream<WsStream>,
    shared: Arc<SessionShared>,
    grace: Duration,
) {
    let close_deadline = async {
        shared.close_requested.cancelled().await;
        tokio::time::sleep(grace).await;
    };
    tokio::pin!(close_deadline);

    let reason = loop {
        let next = tokio::select! {
            next = read.next() => next,
            _ = &mut close_deadline => break "close handshake timed out".to_string(),
        };
        match next {
            Some(Ok(Message::Text(text))) => match decode_frame(&text) {
                Ok(packets) => {
                    for packet in packets {
                        shared.dispatch(packet).await;
                    }
                }
                Err(e) => tracing::warn!("Failed to decode server frame: {}", e),
            },
            Some(Ok(Message::Close(frame))) => {
                break match frame {
                    Some(frame) if !frame.reason.is_empty() => {
                        format!("server closed the connection: {}", frame.reason)
                    }
                    _ => "server closed the connection".to_string(),
                };
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => break e.to_string(),
            None => break "connection closed".to_string(),
        }
    };

    let abandoned = shared.pending.lock().await.clear();
    if abandoned > 0 {
        tracing::debug!("Dropped {} unanswered requests", abandoned);
    }

    if shared.closing.load(Ordering::SeqCst) {
        tracing::debug!("Websocket reader finished after close");
        return;
    }
    tracing::error!("Archipelago connection lost: {}", reason);
    let _ = shared.events.send(RemoteEvent::TransportError(reason));
}

#[async_trait]
impl RemoteSession for ArchipelagoSession {
    fn slot(&self) -> SlotId {
        self.shared.slot
    }

    fn player_alias(&self, slot: SlotId) -> Option<String> {
        self.shared
            .players
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&slot)
            .cloned()
    }

    fn missing_locations(&self) -> BTreeSet<LocationId> {
        self.shared
            .missing
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn initialize_counter(&self, key: &str, default: i64) -> Result<(), TransportError> {
        let packet = self.set_packet(key, default, DataStorageOperation::default_value(default));
        self.send(vec![packet]).await
    }

    async fn read_counter(&self, key: &str) -> Result<i64, TransportError> {
        let value = self.get_value(slot_scoped_key(self.shared.slot, key)).await?;
        match value {
            Value::Null => Ok(0),
            other => other
                .as_i64()
                .or_else(|| other.as_f64().map(|f| f as i64))
                .ok_or_else(|| TransportError::protocol(format!("counter {key} is not a number"))),
        }
    }

    async fn write_counter(&self, key: &str, value: i64) -> Result<(), TransportError> {
        let packet = self.set_packet(key, 0, DataStorageOperation::replace(value));
        self.send(vec![packet]).await
    }

    async fn track_hints(&self) -> Result<(), TransportError> {
        let key = self.shared.hints_key.clone();
        self.send(vec![
            ClientPacket::SetNotify {
                keys: vec![key.clone()],
            },
            ClientPacket::Get {
                keys: vec![key],
                request_id: None,
            },
        ])
        .await
    }

    async fn scout_as_hint(&self, location: LocationId) -> Result<(), TransportError> {
        self.send(vec![ClientPacket::LocationScouts {
            locations: vec![location.get()],
            create_as_hint: 1,
        }])
        .await
    }

    async fn say(&self, text: &str) -> Result<(), TransportError> {
        self.send(vec![ClientPacket::Say {
            text: text.to_string(),
        }])
        .await
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.shared.closing.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.shared.close_requested.cancel();
        // The writer may already be gone if the socket died first.
        let _ = self.outbound.send(Outbound::Close).await;
        let tasks = self.tasks.lock().await.take();
        if let Some(tasks) = tasks {
            tasks.finish(self.close_grace).await;
        }
        Ok(())
    }
}

//! `PrintJSON` messages: classification and plain-text rendering.

use apbridge_domain::SlotId;

use crate::messages::{JsonMessagePart, ServerPacket};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrintKind {
    Chat,
    ServerChat,
    Hint,
    Join,
    Part,
    ItemSend,
    /// A message without a `type` field (plain server text).
    Plain,
    Other(String),
}

impl PrintKind {
    pub fn from_wire(kind: Option<&str>) -> Self {
        match kind {
            None => Self::Plain,
            Some("Chat") => Self::Chat,
            Some("ServerChat") => Self::ServerChat,
            Some("Hint") => Self::Hint,
            Some("Join") => Self::Join,
            Some("Part") => Self::Part,
            Some("ItemSend") => Self::ItemSend,
            Some(other) => Self::Other(other.to_string()),
        }
    }
}

/// A server print message, detached from the wire packet.
#[derive(Debug, Clone, PartialEq)]
pub struct PrintMessage {
    pub kind: PrintKind,
    pub parts: Vec<JsonMessagePart>,
    pub receiving: Option<SlotId>,
    /// Slot that sent the item, for item messages.
    pub sender: Option<SlotId>,
    pub found: Option<bool>,
}

impl PrintMessage {
    pub fn from_packet(packet: ServerPacket) -> Option<Self> {
        match packet {
            ServerPacket::PrintJson {
                data,
                kind,
                receiving,
                item,
                found,
            } => Some(Self {
                kind: PrintKind::from_wire(kind.as_deref()),
                parts: data,
                receiving: receiving.map(SlotId::new),
                sender: item.map(|item| SlotId::new(item.player)),
                found,
            }),
            _ => None,
        }
    }

    /// Concatenate the message parts, replacing `player_id` parts with player aliases
    /// where `alias_of` knows them.
    pub fn render(&self, alias_of: impl Fn(SlotId) -> Option<String>) -> String {
        self.parts
            .iter()
            .map(|part| match part.kind.as_deref() {
                Some("player_id") => part
                    .text
                    .parse::<i32>()
                    .ok()
                    .and_then(|slot| alias_of(SlotId::new(slot)))
                    .unwrap_or_else(|| part.text.clone()),
                _ => part.text.clone(),
            })
            .collect()
    }
}

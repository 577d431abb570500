//! Packet types exchanged with an Archipelago server.
//!
//! Every packet is a JSON object tagged by its `cmd` field. Field names follow the
//! server's snake_case wire names.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use apbridge_domain::{Hint, LocationId, SlotId};

/// `items_handling` bits: remote items plus items found in our own world.
pub const ITEMS_HANDLING_INCLUDE_OWN: u8 = 0b011;

/// Protocol version triple (`class` is always `"Version"` on the wire).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkVersion {
    pub major: u32,
    pub minor: u32,
    pub build: u32,
    #[serde(rename = "class", default = "version_class")]
    pub class: String,
}

fn version_class() -> String {
    "Version".to_string()
}

impl NetworkVersion {
    pub fn new(major: u32, minor: u32, build: u32) -> Self {
        Self {
            major,
            minor,
            build,
            class: version_class(),
        }
    }
}

/// One data storage mutation inside a `Set` packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataStorageOperation {
    pub operation: String,
    pub value: Value,
}

impl DataStorageOperation {
    /// Keep the current value; only the packet's `default` applies when the key is absent.
    pub fn default_value(value: impl Into<Value>) -> Self {
        Self {
            operation: "default".to_string(),
            value: value.into(),
        }
    }

    pub fn replace(value: impl Into<Value>) -> Self {
        Self {
            operation: "replace".to_string(),
            value: value.into(),
        }
    }
}

// =============================================================================
// Client Packets (bridge -> server)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum ClientPacket {
    Connect {
        password: String,
        game: String,
        name: String,
        uuid: String,
        version: NetworkVersion,
        items_handling: u8,
        tags: Vec<String>,
        slot_data: bool,
    },
    /// Extra fields are echoed back in `Retrieved`; `request_id` correlates replies.
    Get {
        keys: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
    Set {
        key: String,
        default: Value,
        want_reply: bool,
        operations: Vec<DataStorageOperation>,
    },
    SetNotify {
        keys: Vec<String>,
    },
    LocationScouts {
        locations: Vec<i64>,
        create_as_hint: u8,
    },
    Say {
        text: String,
    },
}

// =============================================================================
// Server Packets (server -> bridge)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkPlayer {
    pub team: i32,
    pub slot: i32,
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkItem {
    pub item: i64,
    pub location: i64,
    /// Slot that sent (found) the item.
    pub player: i32,
    #[serde(default)]
    pub flags: i32,
}

/// Hint record as stored under the server's `_read_hints_{team}_{slot}` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkHint {
    pub receiving_player: i32,
    pub finding_player: i32,
    pub location: i64,
    pub item: i64,
    #[serde(default)]
    pub found: bool,
    #[serde(default)]
    pub entrance: String,
    #[serde(default)]
    pub item_flags: i32,
}

impl From<NetworkHint> for Hint {
    fn from(hint: NetworkHint) -> Self {
        Hint {
            location: LocationId::new(hint.location),
            finding_player: SlotId::new(hint.finding_player),
            receiving_player: SlotId::new(hint.receiving_player),
            item: hint.item,
            found: hint.found,
        }
    }
}

/// One text fragment of a `PrintJSON` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonMessagePart {
    #[serde(default)]
    pub text: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd")]
pub enum ServerPacket {
    RoomInfo {
        #[serde(default)]
        seed_name: String,
    },
    ConnectionRefused {
        #[serde(default)]
        errors: Vec<String>,
    },
    Connected {
        team: i32,
        slot: i32,
        #[serde(default)]
        players: Vec<NetworkPlayer>,
        #[serde(default)]
        missing_locations: Vec<i64>,
        #[serde(default)]
        checked_locations: Vec<i64>,
    },
    RoomUpdate {
        #[serde(default)]
        checked_locations: Vec<i64>,
        #[serde(default)]
        players: Option<Vec<NetworkPlayer>>,
    },
    Retrieved {
        keys: HashMap<String, Value>,
        #[serde(default)]
        request_id: Option<String>,
    },
    SetReply {
        key: String,
        #[serde(default)]
        value: Value,
        #[serde(default)]
        original_value: Value,
    },
    #[serde(rename = "PrintJSON")]
    PrintJson {
        #[serde(default)]
        data: Vec<JsonMessagePart>,
        #[serde(rename = "type", default)]
        kind: Option<String>,
        #[serde(default)]
        receiving: Option<i32>,
        #[serde(default)]
        item: Option<NetworkItem>,
        #[serde(default)]
        found: Option<bool>,
    },
    InvalidPacket {
        #[serde(rename = "type", default)]
        kind: String,
        #[serde(default)]
        original_cmd: Option<String>,
        #[serde(default)]
        text: String,
    },
    /// Commands this bridge does not handle (ReceivedItems, DataPackage, Bounced, ...).
    #[serde(other)]
    Unknown,
}

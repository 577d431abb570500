//! ApBridge Shared - Archipelago network protocol types
//!
//! Only the subset of the Archipelago protocol the bridge speaks:
//! - Login (`RoomInfo`, `Connect`, `Connected`, `ConnectionRefused`)
//! - Data storage (`Get`, `Set`, `SetNotify`, `Retrieved`, `SetReply`)
//! - Location tracking (`RoomUpdate`) and hint creation (`LocationScouts`)
//! - Chat (`Say`, `PrintJSON`)
//!
//! # Design Principles
//!
//! 1. **No business logic** - pure data types and serialization
//! 2. **Forward compatible** - unknown commands deserialize to `ServerPacket::Unknown`
//! 3. **Frames are arrays** - every websocket text frame carries a JSON array of packets

pub mod codec;
pub mod messages;
pub mod print;
pub mod refusal;
pub mod storage;

pub use codec::{decode_frame, encode_frame, ProtocolError};
pub use messages::{
    ClientPacket, DataStorageOperation, JsonMessagePart, NetworkHint, NetworkItem,
    NetworkPlayer, NetworkVersion, ServerPacket, ITEMS_HANDLING_INCLUDE_OWN,
};
pub use print::{PrintKind, PrintMessage};
pub use refusal::ConnectionRefusedReason;
pub use storage::{hints_key, parse_hints, slot_scoped_key};

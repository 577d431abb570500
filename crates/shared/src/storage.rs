//! Data storage key conventions.

use serde_json::Value;

use apbridge_domain::{Hint, SlotId, TeamId};

use crate::codec::ProtocolError;
use crate::messages::NetworkHint;

/// Key private to one slot, e.g. `Slot:3:ApBridgeTokens`.
pub fn slot_scoped_key(slot: SlotId, key: &str) -> String {
    format!("Slot:{slot}:{key}")
}

/// Read-only key under which the server publishes a slot's hints.
pub fn hints_key(team: TeamId, slot: SlotId) -> String {
    format!("_read_hints_{team}_{slot}")
}

/// Decode the hint list stored under [`hints_key`]. An unset key means no hints.
pub fn parse_hints(value: &Value) -> Result<Vec<Hint>, ProtocolError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    let hints: Vec<NetworkHint> = serde_json::from_value(value.clone())?;
    Ok(hints.into_iter().map(Hint::from).collect())
}

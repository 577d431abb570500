//! Frame encoding: one websocket text frame is a JSON array of packets.

use serde_json::Value;
use thiserror::Error;

use crate::messages::{ClientPacket, ServerPacket};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected a JSON array of packets")]
    NotAnArray,
}

/// Decode a server frame. Packets that fail to deserialize are skipped with a warning
/// so one odd packet cannot hide the rest of the frame.
pub fn decode_frame(text: &str) -> Result<Vec<ServerPacket>, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Array(items) = value else {
        return Err(ProtocolError::NotAnArray);
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<ServerPacket>(item) {
            Ok(packet) => Some(packet),
            Err(e) => {
                tracing::warn!("Skipping undecodable server packet: {}", e);
                None
            }
        })
        .collect())
}

pub fn encode_frame(packets: &[ClientPacket]) -> Result<String, ProtocolError> {
    Ok(serde_json::to_string(packets)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_multiple_packets() {
        let frame = r#"[
            {"cmd": "RoomInfo", "seed_name": "abc", "version": {"major": 0, "minor": 6, "build": 4, "class": "Version"}},
            {"cmd": "Bounced", "data": {}}
        ]"#;

        let packets = decode_frame(frame).unwrap();
        assert_eq!(packets.len(), 2);
        assert!(matches!(&packets[0], ServerPacket::RoomInfo { seed_name } if seed_name == "abc"));
        assert_eq!(packets[1], ServerPacket::Unknown);
    }

    #[test]
    fn skips_malformed_packet() {
        let frame = r#"[{"cmd": "Connected", "team": "not a number"}, {"cmd": "RoomUpdate"}]"#;

        let packets = decode_frame(frame).unwrap();
        assert_eq!(packets.len(), 1);
        assert!(matches!(packets[0], ServerPacket::RoomUpdate { .. }));
    }

    #[test]
    fn rejects_non_array_frame() {
        assert!(matches!(
            decode_frame(r#"{"cmd": "RoomInfo"}"#),
            Err(ProtocolError::NotAnArray)
        ));
    }

    #[test]
    fn encodes_array() {
        let text = encode_frame(&[ClientPacket::Say {
            text: "hi".to_string(),
        }])
        .unwrap();
        assert_eq!(text, r#"[{"cmd":"Say","text":"hi"}]"#);
    }
}

use std::collections::HashMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::{Gopher, Tile};

pub const MSG_INIT: &str = "init";
pub const MSG_CMD: &str = "cmd";
pub const MSG_UPDATE: &str = "update";
pub const MSG_ECHO: &str = "echo";
pub const MSG_ERROR: &str = "error";

/// Client-to-server envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum ClientMsg {
    Cmd(Command),
}

/// The closed set of client actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Command {
    Click { x: i32, y: i32 },
}

/// Server-to-client envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum ServerMsg {
    Init(Snapshot),
    Update(Delta),
    Echo(Value),
    Error(ErrorInfo),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub message: String,
}

/// Full room state, sent once when a client connects.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub room_id: String,
    pub width: i32,
    pub height: i32,
    pub tiles: Vec<Tile>,
    pub gophers: Vec<Gopher>,
    pub resources: HashMap<String, u64>,
}

/// The changes produced by one simulation tick (or one command). The
/// resource ledger is always the full current state, never a diff, so
/// clients can resynchronize totals from any update.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Delta {
    pub tiles: Vec<Tile>,
    pub gophers: Vec<Gopher>,
    pub resources: HashMap<String, u64>,
}

impl Delta {
    /// True when the delta carries a changed tile or gopher. The ledger is
    /// attached unconditionally and does not count as a change by itself.
    pub fn has_changes(&self) -> bool {
        !self.tiles.is_empty() || !self.gophers.is_empty()
    }
}

/// A partially-parsed envelope: the type tag plus the raw payload. Used by
/// the session loop to route before committing to a payload shape.
#[derive(Clone, Debug, Deserialize)]
pub struct RawEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
}

pub fn parse_envelope(frame: &[u8]) -> serde_json::Result<RawEnvelope> {
    serde_json::from_slice(frame)
}

pub fn parse_command(payload: Value) -> serde_json::Result<Command> {
    serde_json::from_value(payload)
}

/// Serialize a message for the wire. Our message types cannot fail to
/// serialize; a failure would yield an empty frame, which receivers discard.
pub fn encode<T: Serialize>(msg: &T) -> Bytes {
    Bytes::from(serde_json::to_vec(msg).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Terrain;

    #[test]
    fn cmd_envelope_round_trips() {
        let raw = r#"{"type":"cmd","payload":{"action":"click","x":3,"y":7}}"#;
        let msg: ClientMsg = serde_json::from_str(raw).unwrap();
        let ClientMsg::Cmd(Command::Click { x, y }) = msg;
        assert_eq!((x, y), (3, 7));
    }

    #[test]
    fn unknown_action_is_rejected() {
        let payload = serde_json::json!({"action": "teleport", "x": 0, "y": 0});
        assert!(parse_command(payload).is_err());
    }

    #[test]
    fn update_carries_tiles_gophers_and_ledger() {
        let mut delta = Delta::default();
        delta.tiles.push(Tile {
            x: 1,
            y: 2,
            terrain: Terrain::Stone,
        });
        delta.resources.insert("wood".to_string(), 5);

        let v = serde_json::to_value(ServerMsg::Update(delta)).unwrap();
        assert_eq!(v["type"], "update");
        assert_eq!(v["payload"]["tiles"][0]["type"], "stone");
        assert_eq!(v["payload"]["resources"]["wood"], 5);
    }

    #[test]
    fn delta_change_detection_ignores_the_ledger() {
        let mut delta = Delta::default();
        delta.resources.insert("wood".to_string(), 1);
        assert!(!delta.has_changes());

        delta.gophers.push(Gopher::new("g1", 0, 0));
        assert!(delta.has_changes());
    }

    #[test]
    fn diagnostic_messages_carry_their_payloads() {
        let v = serde_json::to_value(ServerMsg::Echo(serde_json::json!({"n": 1}))).unwrap();
        assert_eq!(v["type"], "echo");
        assert_eq!(v["payload"]["n"], 1);

        let v = serde_json::to_value(ServerMsg::Error(ErrorInfo {
            message: "room unavailable".to_string(),
        }))
        .unwrap();
        assert_eq!(v["type"], "error");
        assert_eq!(v["payload"]["message"], "room unavailable");
    }

    #[test]
    fn envelope_routing_reads_the_type_tag() {
        let env = parse_envelope(br#"{"type":"cmd","payload":{"action":"click","x":0,"y":0}}"#)
            .unwrap();
        assert_eq!(env.kind, MSG_CMD);
        assert!(parse_command(env.payload).is_ok());

        let env = parse_envelope(br#"{"type":"hello"}"#).unwrap();
        assert_eq!(env.kind, "hello");
        assert!(env.payload.is_null());
    }
}

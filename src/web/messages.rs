//! JSON messages exchanged over the pull and push channels.

use crate::metrics::data::{DynamicSnapshot, StaticSnapshot};
use serde::{Deserialize, Serialize};

/// Messages sent by the server, tagged by `type`.
///
/// `Static` is also the body of `GET /api/static`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMessage {
    Static { data: StaticSnapshot, timestamp: i64 },
    Dynamic { data: DynamicSnapshot, timestamp: i64 },
    Pong { timestamp: i64 },
}

/// Messages a client may send on the push channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMessage {
    /// Build and send a fresh dynamic snapshot
    RequestDynamic,
    /// Send the static snapshot over the push channel
    RequestStatic,
    /// Liveness probe
    Ping,
    /// Any other well-formed `type`
    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_parsing() {
        let parse = |s: &str| serde_json::from_str::<ClientMessage>(s);

        assert_eq!(parse(r#"{"type":"requestDynamic"}"#).unwrap(), ClientMessage::RequestDynamic);
        assert_eq!(parse(r#"{"type":"ping","seq":4}"#).unwrap(), ClientMessage::Ping);
        assert_eq!(parse(r#"{"type":"subscribe"}"#).unwrap(), ClientMessage::Unknown);
        assert!(parse("not json").is_err());
        assert!(parse(r#"{"kind":"ping"}"#).is_err());
    }

    #[test]
    fn test_pong_wire_format() {
        let json = serde_json::to_value(ServerMessage::Pong { timestamp: 42 }).unwrap();
        assert_eq!(json, serde_json::json!({"type": "pong", "timestamp": 42}));
    }
}

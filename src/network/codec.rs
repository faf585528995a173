//! JSON wire format shared with existing UDP peers:
//! `{"type": ..., "term": ..., "from": ..., "data": {...}}`.

use serde::{Deserialize, Serialize};

use super::TransportError;
use crate::election::{Message, PeerId, Term};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum WireKind {
    RequestVote,
    VoteResponse,
    Heartbeat,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WireData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    vote_granted: Option<bool>,
    // No log is replicated; both are always zero on requests we send.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_log_index: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_log_term: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    #[serde(rename = "type")]
    kind: WireKind,
    term: Term,
    from: PeerId,
    #[serde(default)]
    data: WireData,
}

impl From<Message> for WireMessage {
    fn from(message: Message) -> Self {
        match message {
            Message::VoteRequest { term, from } => WireMessage {
                kind: WireKind::RequestVote,
                term,
                from,
                data: WireData {
                    last_log_index: Some(0),
                    last_log_term: Some(0),
                    ..WireData::default()
                },
            },
            Message::VoteResponse {
                term,
                from,
                granted,
            } => WireMessage {
                kind: WireKind::VoteResponse,
                term,
                from,
                data: WireData {
                    vote_granted: Some(granted),
                    ..WireData::default()
                },
            },
            Message::Heartbeat { term, from } => WireMessage {
                kind: WireKind::Heartbeat,
                term,
                from,
                data: WireData::default(),
            },
        }
    }
}

impl WireMessage {
    fn into_message(self) -> Result<Message, TransportError> {
        let WireMessage {
            kind,
            term,
            from,
            data,
        } = self;

        match kind {
            WireKind::RequestVote => Ok(Message::VoteRequest { term, from }),
            WireKind::VoteResponse => {
                let granted = data.vote_granted.ok_or_else(|| {
                    TransportError::Malformed(format!(
                        "VoteResponse from {from} has no vote_granted"
                    ))
                })?;
                Ok(Message::VoteResponse {
                    term,
                    from,
                    granted,
                })
            }
            WireKind::Heartbeat => Ok(Message::Heartbeat { term, from }),
        }
    }
}

pub fn encode(message: Message) -> Result<Vec<u8>, TransportError> {
    serde_json::to_vec(&WireMessage::from(message))
        .map_err(|e| TransportError::Encode(e.to_string()))
}

pub fn decode(bytes: &[u8]) -> Result<Message, TransportError> {
    let wire: WireMessage =
        serde_json::from_slice(bytes).map_err(|e| TransportError::Malformed(e.to_string()))?;
    wire.into_message()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn decodes_messages_from_existing_peers() {
        let request = br#"{"type": "RequestVote", "term": 3, "from": 1, "data": {"last_log_index": 0, "last_log_term": 0}}"#;
        let response = br#"{"type": "VoteResponse", "term": 3, "from": 2, "data": {"vote_granted": true}}"#;
        let heartbeat = br#"{"type": "Heartbeat", "term": 4, "from": 0, "data": {}}"#;

        assert_eq!(
            decode(request).unwrap(),
            Message::VoteRequest { term: 3, from: 1 }
        );
        assert_eq!(
            decode(response).unwrap(),
            Message::VoteResponse {
                term: 3,
                from: 2,
                granted: true
            }
        );
        assert_eq!(
            decode(heartbeat).unwrap(),
            Message::Heartbeat { term: 4, from: 0 }
        );
    }

    #[test]
    fn encodes_the_shared_wire_shape() {
        let bytes = encode(Message::VoteRequest { term: 7, from: 2 }).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "RequestVote",
                "term": 7,
                "from": 2,
                "data": {"last_log_index": 0, "last_log_term": 0}
            })
        );

        let bytes = encode(Message::VoteResponse {
            term: 7,
            from: 1,
            granted: false,
        })
        .unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], "VoteResponse");
        assert_eq!(value["data"]["vote_granted"], false);

        let bytes = encode(Message::Heartbeat { term: 8, from: 0 }).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["data"], json!({}));
    }

    #[test]
    fn missing_data_is_accepted_where_optional() {
        let heartbeat = br#"{"type": "Heartbeat", "term": 1, "from": 3}"#;
        assert_eq!(
            decode(heartbeat).unwrap(),
            Message::Heartbeat { term: 1, from: 3 }
        );
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let heartbeat = br#"{"type": "Heartbeat", "term": 1, "from": 3, "data": {"commit": 9}, "extra": true}"#;
        assert!(decode(heartbeat).is_ok());
    }

    #[test]
    fn malformed_input_is_rejected() {
        let cases: [&[u8]; 6] = [
            b"not json",
            b"",
            br#"{"type": "AppendEntries", "term": 1, "from": 0}"#,
            br#"{"type": "Heartbeat", "from": 0}"#,
            br#"{"type": "Heartbeat", "term": -1, "from": 0}"#,
            br#"{"type": "VoteResponse", "term": 1, "from": 0, "data": {}}"#,
        ];

        for bytes in cases {
            match decode(bytes) {
                Err(TransportError::Malformed(_)) => {}
                other => panic!(
                    "expected Malformed for {:?}, got {other:?}",
                    String::from_utf8_lossy(bytes)
                ),
            }
        }
    }
}

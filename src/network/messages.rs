use serde::{Deserialize, Serialize};

// ── Chat envelope ───────────────────────────────────────────────────────────

/// One item of the broadcast feed the coordinator rides on.
///
/// The feed is an ordinary chat channel with no session concept: `from` is
/// the sender's stable participant id, `emoji` the sender's pet emoji, and
/// `text` is either regular chat or an encoded [`ControlMessage`]. Over the
/// real WebSocket the entry travels as a JSON object.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatEntry {
    pub from: String,
    pub emoji: String,
    pub text: String,
}

impl ChatEntry {
    pub fn new(
        from: impl Into<String>,
        emoji: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            emoji: emoji.into(),
            text: text.into(),
        }
    }

    /// Serialize to the JSON wire envelope.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a JSON wire envelope.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

// ── Control messages ────────────────────────────────────────────────────────

/// Session control messages smuggled through the chat feed.
///
/// Wire grammar (delimiter-separated, base-10 numbers):
///
/// ```text
/// start:<key>:<epochMsDeadline>:<hostEmoji>
/// join:<key>
/// begin:<key>
/// drop:<key>:<x>:<y>:<emoji>
/// ```
///
/// Raw text is decoded into this tagged variant at the boundary; nothing
/// past the router ever pattern-matches on strings.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    /// Announce a new joinable session. The deadline is absolute so every
    /// peer counts down on its own clock even if later messages are lost.
    Start {
        key: String,
        join_ends_at: u64,
        host_emoji: String,
    },
    /// Announce that the sender joined the session.
    Join { key: String },
    /// Announce that joining has closed and the activity is live.
    Begin { key: String },
    /// Best-effort visual of an in-progress drop; never used for scoring.
    Drop {
        key: String,
        x: f32,
        y: f32,
        emoji: String,
    },
}

impl ControlMessage {
    /// Render the wire text for this message.
    pub fn encode(&self) -> String {
        match self {
            Self::Start {
                key,
                join_ends_at,
                host_emoji,
            } => format!("start:{key}:{join_ends_at}:{host_emoji}"),
            Self::Join { key } => format!("join:{key}"),
            Self::Begin { key } => format!("begin:{key}"),
            Self::Drop { key, x, y, emoji } => format!("drop:{key}:{x}:{y}:{emoji}"),
        }
    }

    /// Parse wire text into a control message.
    ///
    /// Field counts are exact and numeric fields must parse; anything else
    /// is an error the router silently discards. Text whose first field is
    /// not a known kind is regular chat, reported as `UnrecognizedKind`.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        let fields: Vec<&str> = text.split(':').collect();
        match fields[0] {
            "start" => {
                expect_fields("start", &fields, 4)?;
                let join_ends_at = fields[2]
                    .parse::<u64>()
                    .map_err(|_| DecodeError::InvalidNumber { field: "deadline" })?;
                Ok(Self::Start {
                    key: fields[1].to_string(),
                    join_ends_at,
                    host_emoji: fields[3].to_string(),
                })
            }
            "join" => {
                expect_fields("join", &fields, 2)?;
                Ok(Self::Join {
                    key: fields[1].to_string(),
                })
            }
            "begin" => {
                expect_fields("begin", &fields, 2)?;
                Ok(Self::Begin {
                    key: fields[1].to_string(),
                })
            }
            "drop" => {
                expect_fields("drop", &fields, 5)?;
                let x = fields[2]
                    .parse::<f32>()
                    .map_err(|_| DecodeError::InvalidNumber { field: "x" })?;
                let y = fields[3]
                    .parse::<f32>()
                    .map_err(|_| DecodeError::InvalidNumber { field: "y" })?;
                Ok(Self::Drop {
                    key: fields[1].to_string(),
                    x,
                    y,
                    emoji: fields[4].to_string(),
                })
            }
            _ => Err(DecodeError::UnrecognizedKind),
        }
    }

    /// The session key this message targets.
    pub fn key(&self) -> &str {
        match self {
            Self::Start { key, .. }
            | Self::Join { key }
            | Self::Begin { key }
            | Self::Drop { key, .. } => key,
        }
    }
}

fn expect_fields(kind: &'static str, fields: &[&str], expected: usize) -> Result<(), DecodeError> {
    if fields.len() != expected {
        return Err(DecodeError::FieldCount {
            kind,
            expected,
            got: fields.len(),
        });
    }
    Ok(())
}

// ── Decode errors ───────────────────────────────────────────────────────────

/// Why a feed item failed to decode as a control message.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// The first field is not a control kind: regular chat, not garbage.
    UnrecognizedKind,
    /// A known kind with the wrong number of fields.
    FieldCount {
        kind: &'static str,
        expected: usize,
        got: usize,
    },
    /// A numeric field that did not parse as base-10.
    InvalidNumber { field: &'static str },
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnrecognizedKind => write!(f, "not a control message"),
            Self::FieldCount {
                kind,
                expected,
                got,
            } => write!(f, "{kind}: expected {expected} fields, got {got}"),
            Self::InvalidNumber { field } => write!(f, "invalid numeric field: {field}"),
        }
    }
}

impl std::error::Error for DecodeError {}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: encode then decode must give back the original.
    fn roundtrip(msg: &ControlMessage) {
        let wire = msg.encode();
        let decoded = ControlMessage::decode(&wire).expect("decode");
        assert_eq!(*msg, decoded);
    }

    // ── Encoding ────────────────────────────────────────────────────────

    #[test]
    fn test_start_wire_format() {
        let msg = ControlMessage::Start {
            key: "a1b2".into(),
            join_ends_at: 1_754_000_000_123,
            host_emoji: "🐶".into(),
        };
        assert_eq!(msg.encode(), "start:a1b2:1754000000123:🐶");
    }

    #[test]
    fn test_join_wire_format() {
        let msg = ControlMessage::Join { key: "a1b2".into() };
        assert_eq!(msg.encode(), "join:a1b2");
    }

    #[test]
    fn test_begin_wire_format() {
        let msg = ControlMessage::Begin { key: "a1b2".into() };
        assert_eq!(msg.encode(), "begin:a1b2");
    }

    #[test]
    fn test_drop_wire_format() {
        let msg = ControlMessage::Drop {
            key: "a1b2".into(),
            x: 42.5,
            y: 0.0,
            emoji: "🐱".into(),
        };
        assert_eq!(msg.encode(), "drop:a1b2:42.5:0:🐱");
    }

    // ── Round-trips ─────────────────────────────────────────────────────

    #[test]
    fn test_roundtrip_all_kinds() {
        roundtrip(&ControlMessage::Start {
            key: "k".into(),
            join_ends_at: 0,
            host_emoji: "🦊".into(),
        });
        roundtrip(&ControlMessage::Join { key: "k".into() });
        roundtrip(&ControlMessage::Begin { key: "k".into() });
        roundtrip(&ControlMessage::Drop {
            key: "k".into(),
            x: -3.25,
            y: 187.75,
            emoji: "🍖".into(),
        });
    }

    #[test]
    fn test_roundtrip_max_deadline() {
        roundtrip(&ControlMessage::Start {
            key: "k".into(),
            join_ends_at: u64::MAX,
            host_emoji: "🐸".into(),
        });
    }

    // ── Malformed input ─────────────────────────────────────────────────

    #[test]
    fn test_regular_chat_is_not_control() {
        assert_eq!(
            ControlMessage::decode("hello everyone"),
            Err(DecodeError::UnrecognizedKind)
        );
        assert_eq!(
            ControlMessage::decode(""),
            Err(DecodeError::UnrecognizedKind)
        );
        // A colon in normal chat must not look like a control message.
        assert_eq!(
            ControlMessage::decode("meet at 10:30"),
            Err(DecodeError::UnrecognizedKind)
        );
    }

    #[test]
    fn test_wrong_field_count_is_rejected() {
        assert!(matches!(
            ControlMessage::decode("start:k:123"),
            Err(DecodeError::FieldCount { kind: "start", .. })
        ));
        assert!(matches!(
            ControlMessage::decode("start:k:123:🐶:extra"),
            Err(DecodeError::FieldCount { .. })
        ));
        assert!(matches!(
            ControlMessage::decode("join"),
            Err(DecodeError::FieldCount { kind: "join", .. })
        ));
        assert!(matches!(
            ControlMessage::decode("begin:k:extra"),
            Err(DecodeError::FieldCount { .. })
        ));
        assert!(matches!(
            ControlMessage::decode("drop:k:1:2"),
            Err(DecodeError::FieldCount { kind: "drop", .. })
        ));
    }

    #[test]
    fn test_non_numeric_fields_are_rejected() {
        assert_eq!(
            ControlMessage::decode("start:k:soon:🐶"),
            Err(DecodeError::InvalidNumber { field: "deadline" })
        );
        assert_eq!(
            ControlMessage::decode("start:k:-5:🐶"),
            Err(DecodeError::InvalidNumber { field: "deadline" })
        );
        assert_eq!(
            ControlMessage::decode("drop:k:left:2:🐶"),
            Err(DecodeError::InvalidNumber { field: "x" })
        );
        assert_eq!(
            ControlMessage::decode("drop:k:1:up:🐶"),
            Err(DecodeError::InvalidNumber { field: "y" })
        );
    }

    #[test]
    fn test_key_accessor() {
        assert_eq!(ControlMessage::Join { key: "abc".into() }.key(), "abc");
        assert_eq!(
            ControlMessage::decode("drop:xyz:1:2:🐶").unwrap().key(),
            "xyz"
        );
    }

    // ── Chat envelope JSON ──────────────────────────────────────────────

    #[test]
    fn test_chat_entry_json_roundtrip() {
        let entry = ChatEntry::new("pet-7", "🐼", "begin:a1b2");
        let json = entry.to_json().unwrap();
        let back = ChatEntry::from_json(&json).unwrap();
        assert_eq!(entry, back);
    }

    #[test]
    fn test_chat_entry_rejects_bad_json() {
        assert!(ChatEntry::from_json("not json").is_err());
        assert!(ChatEntry::from_json("{\"from\":\"x\"}").is_err());
    }
}

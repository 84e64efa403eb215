use serde::{Deserialize, Serialize};

/// Recipient value that makes a message visible to every participant.
pub const BROADCAST_TARGET: &str = "Todos";

/// Status text appended when a participant registers.
pub const ARRIVAL_TEXT: &str = "entered the room";

/// Status text appended when the sweeper evicts a participant.
pub const DEPARTURE_TEXT: &str = "left the room";

/// Minimum length of a display name, counted after trimming.
pub const MIN_NAME_LEN: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub name: String,
    /// Epoch milliseconds of the last registration or heartbeat.
    pub last_seen: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageKind {
    /// Visible to everyone; addressed to [`BROADCAST_TARGET`].
    #[serde(rename = "message", alias = "broadcast_message")]
    Broadcast,
    #[serde(rename = "private_message")]
    Private,
    /// System-generated arrival/departure notice.
    #[serde(rename = "status")]
    Status,
}

impl MessageKind {
    /// Wire and storage name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Broadcast => "message",
            Self::Private => "private_message",
            Self::Status => "status",
        }
    }

    /// Parses a stored kind. Accepts the `broadcast_message` spelling too.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "message" | "broadcast_message" => Some(Self::Broadcast),
            "private_message" => Some(Self::Private),
            "status" => Some(Self::Status),
            _ => None,
        }
    }

    /// Kinds a client is allowed to post. Status messages are server-only.
    pub fn parse_user(s: &str) -> Option<Self> {
        Self::parse(s).filter(|kind| *kind != Self::Status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub text: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    /// `HH:MM:SS` wall-clock time at append.
    pub time: String,
}

impl Message {
    pub fn arrival(name: &str, time: String) -> Self {
        Self::status(name, ARRIVAL_TEXT, time)
    }

    pub fn departure(name: &str, time: String) -> Self {
        Self::status(name, DEPARTURE_TEXT, time)
    }

    fn status(name: &str, text: &str, time: String) -> Self {
        Self {
            from: name.to_string(),
            to: BROADCAST_TARGET.to_string(),
            text: text.to_string(),
            kind: MessageKind::Status,
            time,
        }
    }
}

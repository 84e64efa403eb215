//! Row types. Kept apart from `parlor-types` so the schema can change
//! without touching the wire format.

use parlor_types::models::{Message, MessageKind, Participant};
use tracing::warn;

pub struct ParticipantRow {
    pub name: String,
    pub last_seen: i64,
}

impl From<ParticipantRow> for Participant {
    fn from(row: ParticipantRow) -> Self {
        Participant {
            name: row.name,
            last_seen: row.last_seen,
        }
    }
}

pub struct MessageRow {
    pub id: i64,
    pub sender: String,
    pub recipient: String,
    pub body: String,
    pub kind: String,
    pub time: String,
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        let kind = MessageKind::parse(&row.kind).unwrap_or_else(|| {
            warn!("Corrupt kind '{}' on message {}", row.kind, row.id);
            MessageKind::Broadcast
        });
        Message {
            from: row.sender,
            to: row.recipient,
            text: row.body,
            kind,
            time: row.time,
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

use super::Timestamp;

/// Prefix carried by locally-generated placeholder message ids.
const TEMP_ID_PREFIX: &str = "temp-";

/// Opaque page (thread-group) identifier issued by the messaging backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PageId(pub String);

impl Display for PageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Opaque conversation identifier issued by the messaging backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ConversationId(pub String);

impl Display for ConversationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ConversationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Message identifier: backend-issued, or a local `temp-<epoch-millis>`
/// placeholder awaiting confirmation over the stream.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl MessageId {
    /// Builds a placeholder id for an optimistic send issued at `stamp`.
    #[must_use]
    pub fn temp(stamp: Timestamp) -> Self {
        Self(format!("{TEMP_ID_PREFIX}{}", stamp.epoch_millis()))
    }

    /// Whether this id is a local placeholder rather than a backend id.
    #[must_use]
    pub fn is_temp(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Sender identity attached to every message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sender {
    /// Backend identifier of the sender.
    pub id: String,
    /// Display name of the sender.
    pub name: String,
}

/// Attachment descriptor carried by a message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    /// Attachment kind as reported by the backend (image, video, file, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Download or preview URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Set on locally-constructed previews that have not been uploaded yet.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optimistic: bool,
}

/// A single message inside a conversation, in the backend wire shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Backend id, or a `temp-<ms>` placeholder id.
    pub id: MessageId,

    /// Conversation this message belongs to.
    #[serde(rename = "conversationId")]
    pub conversation_id: ConversationId,

    /// Sender identity.
    pub from: Sender,

    /// Body text. Attachment-only messages carry an empty body.
    #[serde(rename = "message", default)]
    pub text: String,

    /// Backend creation timestamp (local clock for placeholders).
    pub created_time: Timestamp,

    /// Attachment descriptors, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn stamp() -> Timestamp {
        Timestamp(Utc.with_ymd_and_hms(2025, 3, 8, 14, 30, 0).unwrap())
    }

    #[test]
    fn temp_id_form_and_detection() {
        let id = MessageId::temp(stamp());
        assert_eq!(id.0, format!("temp-{}", stamp().epoch_millis()));
        assert!(id.is_temp());
        assert!(!MessageId::from("m.12345").is_temp());
    }

    #[test]
    fn message_wire_round_trip() {
        let json = r#"{
            "id": "m.100",
            "conversationId": "t.200",
            "from": { "id": "u.300", "name": "Asha" },
            "message": "hello",
            "created_time": "2025-03-08T14:30:00Z",
            "attachments": [{ "type": "image", "url": "https://cdn.example/p.png" }]
        }"#;

        let message: Message = serde_json::from_str(json).unwrap();
        assert_eq!(message.id, MessageId::from("m.100"));
        assert_eq!(message.conversation_id, ConversationId::from("t.200"));
        assert_eq!(message.from.name, "Asha");
        assert_eq!(message.text, "hello");
        assert_eq!(message.attachments.len(), 1);
        assert_eq!(message.attachments[0].kind, "image");
        assert!(!message.attachments[0].optimistic);

        let serialized = serde_json::to_string(&message).unwrap();
        let round_tripped: Message = serde_json::from_str(&serialized).unwrap();
        assert_eq!(round_tripped, message);
    }

    #[test]
    fn attachment_only_message_has_empty_body() {
        let json = r#"{
            "id": "m.101",
            "conversationId": "t.200",
            "from": { "id": "u.300", "name": "Asha" },
            "created_time": "2025-03-08T14:30:00Z",
            "attachments": [{ "type": "image", "url": "https://cdn.example/p.png" }]
        }"#;

        let message: Message = serde_json::from_str(json).unwrap();
        assert!(message.text.is_empty());
        assert_eq!(message.attachments.len(), 1);
    }

    #[test]
    fn optimistic_attachment_flag_round_trips() {
        let attachment = Attachment {
            kind: "image".to_string(),
            url: Some("blob:local-preview".to_string()),
            optimistic: true,
        };

        let json = serde_json::to_string(&attachment).unwrap();
        assert!(json.contains("\"optimistic\":true"));

        let parsed: Attachment = serde_json::from_str(&json).unwrap();
        assert!(parsed.optimistic);
    }
}

use serde::{Deserialize, Serialize};

use super::{ConversationId, Timestamp};

/// Summary entry shown in the per-page conversation list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationSummary {
    /// Conversation identifier.
    pub id: ConversationId,
    /// Snippet of the most recent message.
    #[serde(default)]
    pub snippet: String,
    /// Last-activity timestamp.
    pub updated_time: Timestamp,
    /// Backend message-type tag for the latest message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    /// Unread message count.
    #[serde(default)]
    pub unread_count: i64,
}

/// Partial summary update delivered by a `conversation_update` event.
///
/// Only the supplied fields replace the cached entry's values; absent fields
/// leave the entry untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryPatch {
    /// Conversation the patch applies to.
    #[serde(rename = "conversationId")]
    pub conversation_id: ConversationId,
    /// New snippet, if changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
    /// New last-activity timestamp, if changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_time: Option<Timestamp>,
    /// New message-type tag, if changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn summary_round_trip() {
        let summary = ConversationSummary {
            id: ConversationId::from("t.200"),
            snippet: "see you tomorrow".to_string(),
            updated_time: Timestamp(Utc.with_ymd_and_hms(2025, 3, 8, 14, 30, 0).unwrap()),
            message_type: Some("text".to_string()),
            unread_count: 2,
        };

        let json = serde_json::to_string(&summary).unwrap();
        let parsed: ConversationSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, summary);
    }

    #[test]
    fn patch_parses_partial_fields() {
        let json = r#"{ "conversationId": "t.200", "snippet": "new text" }"#;
        let patch: SummaryPatch = serde_json::from_str(json).unwrap();

        assert_eq!(patch.conversation_id, ConversationId::from("t.200"));
        assert_eq!(patch.snippet.as_deref(), Some("new text"));
        assert!(patch.updated_time.is_none());
        assert!(patch.message_type.is_none());
    }
}

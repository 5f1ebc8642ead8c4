use serde::{Deserialize, Serialize};

use super::{Message, SummaryPatch};

/// Event envelope delivered over a page-scoped stream connection.
///
/// The `type` discriminator selects the cache the payload is routed to;
/// unknown discriminators are rejected at decode time and dropped by the
/// router without affecting the connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Handshake acknowledgement sent once per connection. No cache mutation.
    Connected,
    /// A new or redelivered authoritative message.
    MessageUpdate {
        /// The embedded message, carrying its owning conversation id.
        message: Message,
    },
    /// Partial conversation-summary update.
    ConversationUpdate {
        /// The summary patch.
        update: SummaryPatch,
    },
}

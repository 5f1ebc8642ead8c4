use std::{collections::HashMap, sync::Arc};

use shared::models::{ConversationId, Message};
use tokio::sync::RwLock;
use tracing::debug;

/// Reconciliation window: an optimistic placeholder whose timestamp is within
/// this many milliseconds of an arriving authoritative message (inclusive) is
/// considered confirmed by it.
pub const RECONCILE_WINDOW_MS: i64 = 5_000;

/// One entry in a conversation's ordered message list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadEntry {
    /// Backend-confirmed message delivered over the stream or an initial fetch.
    Authoritative(Message),
    /// Locally-fabricated placeholder awaiting confirmation.
    Optimistic(Message),
}

impl ThreadEntry {
    /// The message carried by this entry.
    #[must_use]
    pub const fn message(&self) -> &Message {
        match self {
            Self::Authoritative(message) | Self::Optimistic(message) => message,
        }
    }

    /// Whether this entry is an unconfirmed placeholder.
    #[must_use]
    pub const fn is_optimistic(&self) -> bool {
        matches!(self, Self::Optimistic(_))
    }
}

/// Canonical per-conversation message lists.
///
/// Entries are kept in insertion order, not time order. Writers are the
/// stream driver task and the send coordinator; both serialize through the
/// lock, and readers always receive a cloned snapshot of a fully-applied
/// state.
#[derive(Debug, Clone, Default)]
pub struct ConversationCache {
    inner: Arc<RwLock<HashMap<ConversationId, Vec<ThreadEntry>>>>,
}

impl ConversationCache {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a conversation's list with authoritative messages from an
    /// initial fetch.
    pub async fn prime(&self, conversation_id: ConversationId, messages: Vec<Message>) {
        let entries = messages.into_iter().map(ThreadEntry::Authoritative).collect();
        self.inner.write().await.insert(conversation_id, entries);
    }

    /// Merges an authoritative message into its conversation's list.
    ///
    /// Idempotent over redelivery: a message whose id is already present
    /// leaves the list untouched. Otherwise any optimistic placeholder from
    /// the same sender matching by content (non-empty body text equal) or by
    /// time proximity (within [`RECONCILE_WINDOW_MS`], inclusive) is evicted,
    /// and the message is appended. The first message for an unseen
    /// conversation materializes its entry.
    pub async fn merge(&self, message: Message) {
        let mut guard = self.inner.write().await;
        let Some(entries) = guard.get_mut(&message.conversation_id) else {
            debug!(conversation_id = %message.conversation_id, "materializing conversation entry");
            guard.insert(
                message.conversation_id.clone(),
                vec![ThreadEntry::Authoritative(message)],
            );
            return;
        };

        if entries.iter().any(|entry| entry.message().id == message.id) {
            // Streams may redeliver; applying twice must observably equal once.
            return;
        }

        entries.retain(|entry| !reconciles(entry, &message));
        entries.push(ThreadEntry::Authoritative(message));
    }

    /// Appends an optimistic placeholder, materializing the conversation's
    /// entry when absent.
    pub async fn insert_optimistic(&self, message: Message) {
        let mut guard = self.inner.write().await;
        guard
            .entry(message.conversation_id.clone())
            .or_default()
            .push(ThreadEntry::Optimistic(message));
    }

    /// Current list for a conversation, for rollback. `None` when the
    /// conversation has no cache entry at all.
    pub async fn snapshot(&self, conversation_id: &ConversationId) -> Option<Vec<ThreadEntry>> {
        self.inner.read().await.get(conversation_id).cloned()
    }

    /// Restores a conversation's list to a previously-taken snapshot.
    ///
    /// Restoring a `None` snapshot removes the entry entirely, undoing a
    /// materialization caused by the rolled-back write.
    pub async fn restore(
        &self,
        conversation_id: &ConversationId,
        snapshot: Option<Vec<ThreadEntry>>,
    ) {
        let mut guard = self.inner.write().await;
        match snapshot {
            Some(entries) => {
                guard.insert(conversation_id.clone(), entries);
            }
            None => {
                guard.remove(conversation_id);
            }
        }
    }

    /// Ordered entries for a conversation, cloned. Empty when unseen.
    pub async fn entries(&self, conversation_id: &ConversationId) -> Vec<ThreadEntry> {
        self.inner
            .read()
            .await
            .get(conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Ordered messages for a conversation, cloned. Empty when unseen.
    pub async fn messages(&self, conversation_id: &ConversationId) -> Vec<Message> {
        self.entries(conversation_id)
            .await
            .into_iter()
            .map(|entry| entry.message().clone())
            .collect()
    }
}

/// Whether `incoming` confirms the placeholder held by `entry`.
///
/// Content equality only applies when the incoming message has body text;
/// attachment-only sends have nothing to compare, which is what the bounded
/// time-proximity prong exists for.
fn reconciles(entry: &ThreadEntry, incoming: &Message) -> bool {
    let ThreadEntry::Optimistic(local) = entry else {
        return false;
    };
    if local.from.id != incoming.from.id {
        return false;
    }

    let content_match = !incoming.text.is_empty() && local.text == incoming.text;
    let time_match =
        local.created_time.millis_between(incoming.created_time) <= RECONCILE_WINDOW_MS;

    content_match || time_match
}

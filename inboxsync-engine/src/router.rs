use metrics::counter;
use shared::models::{ConversationId, PageId, StreamEvent};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::cache::{ConversationCache, ConversationListCache};

/// Cache mutation applied by the router, for consumers that render live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheUpdate {
    /// A conversation's message list changed.
    Thread(ConversationId),
    /// A conversation's summary entry changed.
    Summary(ConversationId),
}

/// Decodes inbound event payloads and dispatches them to the cache that owns
/// the touched entity.
///
/// One router exists per page connection; the summary branch patches that
/// page's list, while the message branch caches updates for every
/// conversation, viewed or not, so switching views needs no refetch.
#[derive(Debug)]
pub struct EventRouter {
    page_id: PageId,
    threads: ConversationCache,
    summaries: ConversationListCache,
    updates: broadcast::Sender<CacheUpdate>,
}

impl EventRouter {
    /// Router for one page's stream, writing into the shared caches.
    #[must_use]
    pub fn new(page_id: PageId, threads: ConversationCache, summaries: ConversationListCache) -> Self {
        let (updates, _) = broadcast::channel(256);
        Self {
            page_id,
            threads,
            summaries,
            updates,
        }
    }

    /// Subscribes to applied-update notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CacheUpdate> {
        self.updates.subscribe()
    }

    /// Decodes one raw payload and routes it.
    ///
    /// Malformed payloads are logged and dropped; one bad event must never
    /// tear down the stream.
    pub async fn route_raw(&self, payload: &str) {
        match serde_json::from_str::<StreamEvent>(payload) {
            Ok(event) => self.route(event).await,
            Err(err) => {
                warn!(page_id = %self.page_id, error = %err, "discarding malformed stream event");
                counter!("inboxsync_stream_discarded_events_total").increment(1);
            }
        }
    }

    /// Routes one decoded event to its cache mutator.
    pub async fn route(&self, event: StreamEvent) {
        counter!("inboxsync_stream_events_total").increment(1);
        match event {
            StreamEvent::Connected => {
                debug!(page_id = %self.page_id, "stream handshake acknowledged");
            }
            StreamEvent::MessageUpdate { message } => {
                let conversation_id = message.conversation_id.clone();
                self.threads.merge(message).await;
                let _ = self.updates.send(CacheUpdate::Thread(conversation_id));
            }
            StreamEvent::ConversationUpdate { update } => {
                let conversation_id = update.conversation_id.clone();
                self.summaries.patch(&self.page_id, &update).await;
                let _ = self.updates.send(CacheUpdate::Summary(conversation_id));
            }
        }
    }
}

use std::{collections::HashMap, sync::Arc};

use shared::models::{ConversationSummary, PageId, SummaryPatch};
use tokio::sync::RwLock;
use tracing::debug;

/// Canonical per-page conversation-summary lists.
///
/// Lists are populated by an initial fetch owned outside the engine and
/// patched in place by routed `conversation_update` events. Patching never
/// reorders and never inserts.
#[derive(Debug, Clone, Default)]
pub struct ConversationListCache {
    inner: Arc<RwLock<HashMap<PageId, Vec<ConversationSummary>>>>,
}

impl ConversationListCache {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a page's summary list from an initial fetch.
    pub async fn prime(&self, page_id: PageId, summaries: Vec<ConversationSummary>) {
        self.inner.write().await.insert(page_id, summaries);
    }

    /// Applies a partial update to the matching entry of a page's list.
    ///
    /// No-op when the page has no cached list, and when no entry matches the
    /// patched conversation id; only the supplied fields are replaced.
    pub async fn patch(&self, page_id: &PageId, patch: &SummaryPatch) {
        let mut guard = self.inner.write().await;
        let Some(summaries) = guard.get_mut(page_id) else {
            debug!(page_id = %page_id, "no summary list cached; dropping patch");
            return;
        };

        for summary in &mut *summaries {
            if summary.id != patch.conversation_id {
                continue;
            }
            if let Some(snippet) = &patch.snippet {
                summary.snippet.clone_from(snippet);
            }
            if let Some(updated_time) = patch.updated_time {
                summary.updated_time = updated_time;
            }
            if let Some(message_type) = &patch.message_type {
                summary.message_type = Some(message_type.clone());
            }
        }
    }

    /// Cloned summary list for a page. `None` when no list has been primed.
    pub async fn summaries(&self, page_id: &PageId) -> Option<Vec<ConversationSummary>> {
        self.inner.read().await.get(page_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use shared::models::{ConversationId, Timestamp};

    fn stamp() -> Timestamp {
        Timestamp(Utc.with_ymd_and_hms(2025, 3, 8, 14, 30, 0).unwrap())
    }

    fn summary(id: &str, snippet: &str) -> ConversationSummary {
        ConversationSummary {
            id: ConversationId::from(id),
            snippet: snippet.to_string(),
            updated_time: stamp(),
            message_type: None,
            unread_count: 0,
        }
    }

    fn snippet_patch(id: &str, snippet: &str) -> SummaryPatch {
        SummaryPatch {
            conversation_id: ConversationId::from(id),
            snippet: Some(snippet.to_string()),
            updated_time: None,
            message_type: None,
        }
    }

    #[tokio::test]
    async fn patches_matching_entry_in_place() {
        let cache = ConversationListCache::new();
        let page = PageId::from("p.1");
        cache
            .prime(page.clone(), vec![summary("t.1", "old"), summary("t.2", "other")])
            .await;

        cache.patch(&page, &snippet_patch("t.1", "new")).await;

        let summaries = cache.summaries(&page).await.unwrap();
        assert_eq!(summaries[0].snippet, "new");
        assert_eq!(summaries[1].snippet, "other");
    }

    #[tokio::test]
    async fn preserves_order_and_unpatched_fields() {
        let cache = ConversationListCache::new();
        let page = PageId::from("p.1");
        let mut second = summary("t.2", "keep");
        second.unread_count = 3;
        cache.prime(page.clone(), vec![summary("t.1", "a"), second]).await;

        let patch = SummaryPatch {
            conversation_id: ConversationId::from("t.2"),
            snippet: None,
            updated_time: None,
            message_type: Some("text".to_string()),
        };
        cache.patch(&page, &patch).await;

        let summaries = cache.summaries(&page).await.unwrap();
        assert_eq!(summaries[0].id, ConversationId::from("t.1"));
        assert_eq!(summaries[1].id, ConversationId::from("t.2"));
        assert_eq!(summaries[1].snippet, "keep");
        assert_eq!(summaries[1].unread_count, 3);
        assert_eq!(summaries[1].message_type.as_deref(), Some("text"));
    }

    #[tokio::test]
    async fn unknown_conversation_id_leaves_list_unchanged() {
        let cache = ConversationListCache::new();
        let page = PageId::from("p.1");
        cache.prime(page.clone(), vec![summary("t.1", "a")]).await;
        let before = cache.summaries(&page).await;

        cache.patch(&page, &snippet_patch("t.999", "phantom")).await;

        assert_eq!(cache.summaries(&page).await, before);
        assert_eq!(cache.summaries(&page).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unprimed_page_is_a_no_op() {
        let cache = ConversationListCache::new();
        let page = PageId::from("p.1");

        cache.patch(&page, &snippet_patch("t.1", "new")).await;

        assert!(cache.summaries(&page).await.is_none());
    }
}

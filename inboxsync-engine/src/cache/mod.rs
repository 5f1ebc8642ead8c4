//! Canonical client-side caches.
//!
//! [`ConversationCache`] owns the per-conversation message lists and the
//! merge/reconciliation algorithm; [`ConversationListCache`] owns the
//! per-page summary lists. They are the sole mutable owners of their
//! entities; the connection layer only hands them decoded events.

pub mod summary;
pub mod thread;

pub use summary::ConversationListCache;
pub use thread::{ConversationCache, ThreadEntry};

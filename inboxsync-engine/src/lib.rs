#![cfg_attr(not(test), forbid(unsafe_code))]
#![deny(warnings, clippy::pedantic)]
#![allow(clippy::multiple_crate_versions)]

//! Client-side real-time synchronization engine for the platform inbox.
//!
//! The engine keeps an in-memory mirror of inbox state live against the
//! backend's per-page event stream: [`connection`] owns the stream lifecycle
//! and reconnect policy, [`router`] decodes and dispatches events, [`cache`]
//! holds the canonical conversation and summary state, and [`send`]
//! coordinates optimistic outbound messages against that state.

pub mod backoff;
pub mod cache;
pub mod connection;
pub mod error;
pub mod router;
pub mod send;
pub mod transport;

pub use backoff::{MAX_RECONNECT_ATTEMPTS, ReconnectBackoff, delay_for_attempt};
pub use cache::{ConversationCache, ConversationListCache, ThreadEntry};
pub use connection::{ConnectionPhase, ConnectionSession, StreamManager};
pub use error::{SendError, TransportError};
pub use router::{CacheUpdate, EventRouter};
pub use send::{
    FileUpload, HttpSendApi, OutgoingMessage, SendApi, SendCoordinator, SendFailure,
    SendMessageRequest,
};
pub use transport::{EventFrames, SseTransport, StreamTransport};

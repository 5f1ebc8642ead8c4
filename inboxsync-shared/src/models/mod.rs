//! Wire-format models exchanged with the messaging backend.

pub mod conversation;
pub mod errors;
pub mod message;
pub mod streaming;
pub mod timestamp;

pub use conversation::{ConversationSummary, SummaryPatch};
pub use errors::ErrorResponse;
pub use message::{Attachment, ConversationId, Message, MessageId, PageId, Sender};
pub use streaming::StreamEvent;
pub use timestamp::Timestamp;

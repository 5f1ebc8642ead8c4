use std::sync::Arc;

use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use shared::{
    config::ClientConfig,
    models::{
        Attachment, ConversationId, ErrorResponse, Message, MessageId, PageId, Sender, Timestamp,
    },
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{cache::ConversationCache, error::SendError};

/// File attachment accompanying an outbound message: its media kind and an
/// optional local preview URL for the placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileUpload {
    /// Media kind, e.g. `image` or `file`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Local preview URL rendered until the backend echoes the real one.
    #[serde(rename = "previewUrl", skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

/// Wire body of the send endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMessageRequest {
    /// Target conversation.
    #[serde(rename = "conversationId")]
    pub conversation_id: ConversationId,
    /// Page the conversation belongs to.
    #[serde(rename = "pageId")]
    pub page_id: PageId,
    /// Body text, absent for attachment-only sends.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Attachment, absent for text-only sends.
    #[serde(rename = "fileUpload", skip_serializing_if = "Option::is_none")]
    pub file_upload: Option<FileUpload>,
}

/// A message the application wants delivered.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    /// Page the conversation belongs to.
    pub page_id: PageId,
    /// Target conversation.
    pub conversation_id: ConversationId,
    /// Body text.
    pub text: Option<String>,
    /// Attachment.
    pub file: Option<FileUpload>,
}

/// Notice emitted when a send fails and its placeholder is rolled back, for
/// surfacing to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendFailure {
    /// Page the failed send belonged to.
    pub page_id: PageId,
    /// Conversation whose placeholder was rolled back.
    pub conversation_id: ConversationId,
    /// Provisional id of the rolled-back placeholder.
    pub message_id: MessageId,
    /// Rendered failure cause.
    pub reason: String,
}

/// Seam between the send coordinator and the messaging backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SendApi: Send + Sync {
    /// Delivers one outbound message request.
    ///
    /// # Errors
    /// Returns [`SendError`] when the request fails in transit or the backend
    /// refuses delivery. Success carries no body: the confirmed message
    /// arrives over the event stream.
    async fn send(&self, request: SendMessageRequest) -> Result<(), SendError>;
}

/// Production send backend: JSON POST over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpSendApi {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpSendApi {
    /// Builds a sender against the configured send endpoint.
    #[must_use]
    pub fn new(client: reqwest::Client, config: ClientConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl SendApi for HttpSendApi {
    async fn send(&self, request: SendMessageRequest) -> Result<(), SendError> {
        let url = self.config.send_url()?;
        let response = self.client.post(url).json(&request).send().await?;

        let status = response.status();
        if status.is_success() {
            debug!(conversation_id = %request.conversation_id, "send accepted");
            return Ok(());
        }

        let body = response.text().await?;
        let rejection = serde_json::from_str::<ErrorResponse>(&body)
            .unwrap_or_else(|_| ErrorResponse::new(format!("send rejected with status {status}")));
        Err(SendError::Rejected(rejection))
    }
}

/// Coordinates optimistic sends: placeholder insertion, delivery, and
/// rollback on failure.
///
/// On success the cache is deliberately left alone; the authoritative copy
/// arrives over the stream and the merge path retires the placeholder. That
/// makes the outcome independent of whether the stream confirmation beats the
/// HTTP response.
pub struct SendCoordinator {
    api: Arc<dyn SendApi>,
    threads: ConversationCache,
    identity: Sender,
    notices: mpsc::UnboundedSender<SendFailure>,
}

impl SendCoordinator {
    /// Coordinator sending as `identity`, with a receiver for failure
    /// notices.
    #[must_use]
    pub fn new(
        api: Arc<dyn SendApi>,
        threads: ConversationCache,
        identity: Sender,
    ) -> (Self, mpsc::UnboundedReceiver<SendFailure>) {
        let (notices, notice_rx) = mpsc::unbounded_channel();
        (
            Self {
                api,
                threads,
                identity,
                notices,
            },
            notice_rx,
        )
    }

    /// Submits a message: inserts an optimistic placeholder, performs the
    /// send, and rolls the conversation back to its pre-send state when
    /// delivery fails.
    ///
    /// Returns the placeholder's provisional id; the confirmed message
    /// arrives over the event stream.
    ///
    /// # Errors
    /// Returns [`SendError::Empty`] when the message has neither text nor an
    /// attachment, and propagates delivery failures after rolling back.
    pub async fn submit(&self, outgoing: OutgoingMessage) -> Result<MessageId, SendError> {
        if outgoing.text.as_deref().is_none_or(str::is_empty) && outgoing.file.is_none() {
            return Err(SendError::Empty);
        }

        let stamp = Timestamp::now();
        let id = MessageId::temp(stamp);
        let placeholder = Message {
            id: id.clone(),
            conversation_id: outgoing.conversation_id.clone(),
            from: self.identity.clone(),
            text: outgoing.text.clone().unwrap_or_default(),
            created_time: stamp,
            attachments: outgoing
                .file
                .iter()
                .map(|file| Attachment {
                    kind: file.kind.clone(),
                    url: file.preview_url.clone(),
                    optimistic: true,
                })
                .collect(),
        };

        let snapshot = self.threads.snapshot(&outgoing.conversation_id).await;
        self.threads.insert_optimistic(placeholder).await;
        counter!("inboxsync_send_attempts_total").increment(1);

        let request = SendMessageRequest {
            conversation_id: outgoing.conversation_id.clone(),
            page_id: outgoing.page_id.clone(),
            message: outgoing.text,
            file_upload: outgoing.file,
        };

        match self.api.send(request).await {
            Ok(()) => Ok(id),
            Err(err) => {
                warn!(
                    conversation_id = %outgoing.conversation_id,
                    error = %err,
                    "send failed; rolling back placeholder"
                );
                self.threads.restore(&outgoing.conversation_id, snapshot).await;
                counter!("inboxsync_send_rollbacks_total").increment(1);
                let _ = self.notices.send(SendFailure {
                    page_id: outgoing.page_id,
                    conversation_id: outgoing.conversation_id,
                    message_id: id,
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }
}

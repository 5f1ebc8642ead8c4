use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use shared::{config::ClientConfig, models::PageId};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::error::TransportError;

/// Raw event payloads delivered by an open stream connection, in arrival
/// order. Each item is the `data` body of one server-sent event.
pub type EventFrames = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

/// Seam between the connection state machine and the wire.
///
/// A successful return means the stream endpoint accepted the connection;
/// the session resets its backoff counter on that signal alone.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Opens a page-scoped event stream.
    ///
    /// # Errors
    /// Returns [`TransportError::Connect`] when the endpoint cannot be
    /// reached or rejects the request.
    async fn connect(&self, page_id: &PageId) -> Result<EventFrames, TransportError>;
}

impl std::fmt::Debug for dyn StreamTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StreamTransport")
    }
}

/// Production transport: server-sent events over a `reqwest` byte stream.
#[derive(Debug, Clone)]
pub struct SseTransport {
    client: reqwest::Client,
    config: ClientConfig,
}

impl SseTransport {
    /// Builds a transport against the configured stream endpoint.
    #[must_use]
    pub fn new(client: reqwest::Client, config: ClientConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl StreamTransport for SseTransport {
    async fn connect(&self, page_id: &PageId) -> Result<EventFrames, TransportError> {
        let url = self
            .config
            .stream_url(&page_id.0)
            .map_err(|err| TransportError::Connect(err.to_string()))?;

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| TransportError::Connect(err.to_string()))?
            .error_for_status()
            .map_err(|err| TransportError::Connect(err.to_string()))?;

        debug!(page_id = %page_id, url = %url, "stream connection opened");

        let (tx, rx) = mpsc::channel::<Result<String, TransportError>>(64);
        tokio::spawn(async move {
            let mut bytes = response.bytes_stream();
            let mut assembler = SseAssembler::default();

            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(buf) => {
                        for payload in assembler.push(&buf) {
                            if tx.send(Ok(payload)).await.is_err() {
                                // Consumer went away; stop reading.
                                return;
                            }
                        }
                    }
                    Err(err) => {
                        let _ = tx
                            .send(Err(TransportError::Interrupted(err.to_string())))
                            .await;
                        return;
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

/// Incremental server-sent-event parser.
///
/// Buffers raw bytes and splits on line feeds only, so a multi-byte UTF-8
/// sequence split across network chunks is decoded intact once its line
/// completes. Emits one payload per blank-line-terminated event; `event:`
/// and `id:` fields are ignored, the JSON payload carries its own `type`
/// discriminator.
#[derive(Debug, Default)]
struct SseAssembler {
    line_buf: Vec<u8>,
    data_buf: String,
}

impl SseAssembler {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut completed = Vec::new();
        self.line_buf.extend_from_slice(chunk);

        while let Some(newline) = self.line_buf.iter().position(|&byte| byte == b'\n') {
            let line_bytes: Vec<u8> = self.line_buf.drain(..=newline).collect();
            let decoded = String::from_utf8_lossy(&line_bytes);
            let line = decoded.trim_end_matches(['\n', '\r']);

            if let Some(value) = line.strip_prefix("data:") {
                self.data_buf.push_str(value.trim_start());
            } else if line.is_empty() && !self.data_buf.is_empty() {
                completed.push(std::mem::take(&mut self.data_buf));
            }
        }

        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembles_single_event() {
        let mut assembler = SseAssembler::default();
        let payloads = assembler.push(b"data: {\"type\":\"connected\"}\n\n");
        assert_eq!(payloads, vec!["{\"type\":\"connected\"}"]);
    }

    #[test]
    fn reassembles_lines_split_across_chunks() {
        let mut assembler = SseAssembler::default();
        assert!(assembler.push(b"data: {\"type\":").is_empty());
        assert!(assembler.push(b"\"connected\"}\r\n").is_empty());
        let payloads = assembler.push(b"\n");
        assert_eq!(payloads, vec!["{\"type\":\"connected\"}"]);
    }

    #[test]
    fn reassembles_multibyte_chars_split_across_chunks() {
        let mut assembler = SseAssembler::default();
        let bytes = "data: {\"text\":\"héllo\"}\n\n".as_bytes();
        // Split in the middle of the two-byte 'é' sequence.
        let split = bytes.iter().position(|&byte| byte == 0xC3).unwrap() + 1;

        assert!(assembler.push(&bytes[..split]).is_empty());
        let payloads = assembler.push(&bytes[split..]);
        assert_eq!(payloads, vec!["{\"text\":\"héllo\"}"]);
    }

    #[test]
    fn ignores_event_and_id_fields() {
        let mut assembler = SseAssembler::default();
        let payloads = assembler.push(b"event: update\nid: 42\ndata: {\"a\":1}\n\n");
        assert_eq!(payloads, vec!["{\"a\":1}"]);
    }

    #[test]
    fn emits_multiple_events_from_one_chunk() {
        let mut assembler = SseAssembler::default();
        let payloads = assembler.push(b"data: one\n\ndata: two\n\n");
        assert_eq!(payloads, vec!["one", "two"]);
    }

    #[test]
    fn blank_line_without_data_emits_nothing() {
        let mut assembler = SseAssembler::default();
        assert!(assembler.push(b"\n\n\n").is_empty());
    }
}

use shared::models::ErrorResponse;
use thiserror::Error;

/// Failures reported by a stream transport.
///
/// Both variants are recoverable: the connection session answers them with
/// bounded-backoff reconnects and only goes terminal after the attempt budget
/// is spent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The stream endpoint could not be opened.
    #[error("failed to open stream: {0}")]
    Connect(String),

    /// An established stream failed mid-flight.
    #[error("stream interrupted: {0}")]
    Interrupted(String),
}

/// Failures reported by the outbound send operation.
#[derive(Debug, Error)]
pub enum SendError {
    /// Neither body text nor a file upload was supplied.
    #[error("nothing to send: message has no text and no attachment")]
    Empty,

    /// The request never reached the backend or the response was unreadable.
    #[error("send request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend accepted the request but refused to deliver it.
    #[error("send rejected by backend: {0}")]
    Rejected(ErrorResponse),

    /// The configured send endpoint does not form a valid URL.
    #[error("invalid send endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_render_their_context() {
        let err = TransportError::Connect("connection refused".to_string());
        assert_eq!(err.to_string(), "failed to open stream: connection refused");

        let err = TransportError::Interrupted("unexpected eof".to_string());
        assert_eq!(err.to_string(), "stream interrupted: unexpected eof");
    }

    #[test]
    fn send_rejection_carries_backend_message() {
        let err = SendError::Rejected(ErrorResponse::new("outside messaging window"));
        assert!(err.to_string().contains("outside messaging window"));
    }
}

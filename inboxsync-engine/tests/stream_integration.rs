//! End-to-end tests against a real SSE backend stood up with axum.

#![deny(warnings, clippy::pedantic)]
#![allow(clippy::multiple_crate_versions)]

use std::{convert::Infallible, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    Json, Router,
    extract::Path,
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event, Sse},
    },
    routing::{get, post},
};
use chrono::{TimeZone, Utc};
use engine::{
    ConversationCache, HttpSendApi, OutgoingMessage, SendCoordinator, SendError,
    SendMessageRequest, SseTransport, StreamManager,
};
use futures_util::{Stream, StreamExt, stream};
use shared::{
    config::ClientConfig,
    models::{ConversationId, ConversationSummary, ErrorResponse, PageId, Sender, Timestamp},
};
use url::Url;

async fn stream_page(Path(page_id): Path<String>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    assert_eq!(page_id, "p.1");
    let payloads = vec![
        r#"{"type":"connected"}"#.to_string(),
        r#"{"type":"message_update","message":{"id":"m.1","conversationId":"t.1","from":{"id":"u.1","name":"Asha"},"message":"hello from the stream","created_time":"2025-03-08T14:30:00Z"}}"#.to_string(),
        r#"{"type":"conversation_update","update":{"conversationId":"t.1","snippet":"hello from the stream"}}"#.to_string(),
    ];
    let events = payloads
        .into_iter()
        .map(|payload| Ok(Event::default().data(payload)));
    // Stay open after the scripted events; a healthy stream never ends.
    Sse::new(stream::iter(events).chain(stream::pending()))
}

async fn send_message(Json(request): Json<SendMessageRequest>) -> Response {
    if request.message.as_deref() == Some("blocked") {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("messaging window closed")),
        )
            .into_response()
    } else {
        StatusCode::NO_CONTENT.into_response()
    }
}

async fn spawn_backend() -> SocketAddr {
    let app = Router::new()
        .route("/api/stream/pages/{page_id}", get(stream_page))
        .route("/api/messages/send", post(send_message));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("listener address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve test backend");
    });
    addr
}

fn config_for(addr: SocketAddr) -> ClientConfig {
    let mut config = ClientConfig::with_defaults();
    config.api_base = Url::parse(&format!("http://{addr}/api/")).expect("backend base URL");
    config
}

#[tokio::test]
async fn stream_events_populate_the_caches() {
    let addr = spawn_backend().await;
    let transport = Arc::new(SseTransport::new(reqwest::Client::new(), config_for(addr)));
    let manager = StreamManager::new(transport);
    let page = PageId::from("p.1");
    let conversation = ConversationId::from("t.1");

    manager
        .summaries()
        .prime(
            page.clone(),
            vec![ConversationSummary {
                id: conversation.clone(),
                snippet: "stale".to_string(),
                updated_time: Timestamp(Utc.with_ymd_and_hms(2025, 3, 8, 14, 0, 0).unwrap()),
                message_type: None,
                unread_count: 0,
            }],
        )
        .await;

    let session = manager.subscribe(page.clone()).await;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let messages = manager.threads().messages(&conversation).await;
        let summaries = manager.summaries().summaries(&page).await.unwrap();
        if !messages.is_empty() && summaries[0].snippet == "hello from the stream" {
            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0].text, "hello from the stream");
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for stream events"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    manager.unsubscribe(&page).await;
    assert_eq!(session.phase(), engine::ConnectionPhase::Closed);
}

#[tokio::test]
async fn send_round_trip_and_rejection_rollback() {
    let addr = spawn_backend().await;
    let api = Arc::new(HttpSendApi::new(reqwest::Client::new(), config_for(addr)));
    let threads = ConversationCache::new();
    let identity = Sender {
        id: "page.1".to_string(),
        name: "Support".to_string(),
    };
    let (coordinator, mut notices) = SendCoordinator::new(api, threads.clone(), identity);
    let conversation = ConversationId::from("t.1");

    // Accepted send: the placeholder stays until the stream confirms it.
    let id = coordinator
        .submit(OutgoingMessage {
            page_id: PageId::from("p.1"),
            conversation_id: conversation.clone(),
            text: Some("hello".to_string()),
            file: None,
        })
        .await
        .expect("send accepted");
    assert!(id.is_temp());
    let entries = threads.entries(&conversation).await;
    assert_eq!(entries.len(), 1);
    assert!(entries[0].is_optimistic());

    // Refused send: the conversation rolls back to its pre-send state.
    let result = coordinator
        .submit(OutgoingMessage {
            page_id: PageId::from("p.1"),
            conversation_id: conversation.clone(),
            text: Some("blocked".to_string()),
            file: None,
        })
        .await;
    assert!(matches!(result, Err(SendError::Rejected(_))));
    assert_eq!(threads.entries(&conversation).await, entries);

    let failure = notices.recv().await.expect("failure notice");
    assert_eq!(failure.conversation_id, conversation);
    assert!(failure.reason.contains("messaging window closed"));
}

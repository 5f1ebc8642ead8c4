use std::{
    collections::HashMap,
    sync::{Arc, Mutex, atomic::{AtomicBool, Ordering}},
    time::Duration,
};

use futures_util::StreamExt;
use metrics::counter;
use shared::models::PageId;
use tokio::sync::{RwLock, watch};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    backoff::ReconnectBackoff,
    cache::{ConversationCache, ConversationListCache},
    router::EventRouter,
    transport::StreamTransport,
};

/// Lifecycle phase of one page-scoped stream connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionPhase {
    /// Session constructed, driver not started.
    Idle,
    /// Opening the transport.
    Connecting,
    /// Live stream; events are flowing to the router.
    Connected,
    /// Backing off before the next connect attempt.
    Reconnecting,
    /// Terminal: torn down, or reconnect budget exhausted. Recovery is a
    /// fresh subscription.
    Closed,
}

/// One page's stream connection: owns the transport handle, the reconnect
/// state machine, and the driver task feeding the router.
///
/// Explicit `open`/`close` lifecycle; `close` is unconditional and leaves the
/// session inert, so late transport callbacks cannot mutate cache state.
#[derive(Debug)]
pub struct ConnectionSession {
    page_id: PageId,
    transport: Arc<dyn StreamTransport>,
    router: Arc<EventRouter>,
    token: CancellationToken,
    phase: watch::Sender<ConnectionPhase>,
    started: AtomicBool,
    scheduled: Mutex<Vec<Duration>>,
}

impl ConnectionSession {
    /// New idle session for `page_id`. Call [`open`](Self::open) to start.
    #[must_use]
    pub fn new(
        page_id: PageId,
        transport: Arc<dyn StreamTransport>,
        router: Arc<EventRouter>,
    ) -> Arc<Self> {
        let (phase, _) = watch::channel(ConnectionPhase::Idle);
        Arc::new(Self {
            page_id,
            transport,
            router,
            token: CancellationToken::new(),
            phase,
            started: AtomicBool::new(false),
            scheduled: Mutex::new(Vec::new()),
        })
    }

    /// Starts the driver task. Idempotent: repeated calls are no-ops.
    pub fn open(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let session = Arc::clone(self);
        tokio::spawn(async move { session.drive().await });
    }

    /// Tears the session down: cancels the driver, any pending reconnect
    /// sleep, and the transport read. Safe to call more than once.
    pub fn close(&self) {
        self.token.cancel();
        self.phase.send_replace(ConnectionPhase::Closed);
    }

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> ConnectionPhase {
        *self.phase.borrow()
    }

    /// Watch channel over lifecycle phases.
    #[must_use]
    pub fn phase_watch(&self) -> watch::Receiver<ConnectionPhase> {
        self.phase.subscribe()
    }

    /// Router owning this session's decoded-event dispatch.
    #[must_use]
    pub fn router(&self) -> &Arc<EventRouter> {
        &self.router
    }

    /// Reconnect delays scheduled since the last successful open, oldest
    /// first. Bounded by the attempt budget; a successful open clears it
    /// along with the backoff counter.
    #[must_use]
    pub fn scheduled_delays(&self) -> Vec<Duration> {
        match self.scheduled.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_phase(&self, next: ConnectionPhase) {
        // Inertness guard: a torn-down session stays Closed no matter what
        // the driver observes afterwards.
        if self.token.is_cancelled() {
            return;
        }
        self.phase.send_replace(next);
    }

    fn record_delay(&self, delay: Duration) {
        match self.scheduled.lock() {
            Ok(mut guard) => guard.push(delay),
            Err(poisoned) => poisoned.into_inner().push(delay),
        }
    }

    fn clear_delays(&self) {
        match self.scheduled.lock() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    async fn drive(self: Arc<Self>) {
        let mut backoff = ReconnectBackoff::new();

        loop {
            if self.token.is_cancelled() {
                return;
            }
            self.set_phase(ConnectionPhase::Connecting);

            let connect = tokio::select! {
                () = self.token.cancelled() => return,
                result = self.transport.connect(&self.page_id) => result,
            };

            match connect {
                Ok(mut frames) => {
                    // Only a successful open clears backoff state; the delay
                    // ledger is cleared with it so a long-lived flapping
                    // connection never accumulates entries.
                    backoff.reset();
                    self.clear_delays();
                    counter!("inboxsync_stream_connects_total").increment(1);
                    self.set_phase(ConnectionPhase::Connected);
                    info!(page_id = %self.page_id, "stream connected");

                    loop {
                        // Biased so a teardown racing a ready frame always
                        // wins; a closed session must never route.
                        let frame = tokio::select! {
                            biased;
                            () = self.token.cancelled() => return,
                            frame = frames.next() => frame,
                        };
                        match frame {
                            Some(Ok(payload)) => self.router.route_raw(&payload).await,
                            Some(Err(err)) => {
                                warn!(page_id = %self.page_id, error = %err, "stream dropped");
                                break;
                            }
                            None => {
                                // The backend never ends a healthy page
                                // stream; clean EOF takes the reconnect path.
                                warn!(page_id = %self.page_id, "stream ended");
                                break;
                            }
                        }
                    }
                }
                Err(err) => {
                    warn!(page_id = %self.page_id, error = %err, "failed to open stream");
                }
            }

            let Some(delay) = backoff.next_delay() else {
                warn!(page_id = %self.page_id, "reconnect attempts exhausted; session closed");
                counter!("inboxsync_stream_terminal_closes_total").increment(1);
                self.set_phase(ConnectionPhase::Closed);
                return;
            };

            counter!("inboxsync_stream_reconnects_total").increment(1);
            self.record_delay(delay);
            self.set_phase(ConnectionPhase::Reconnecting);
            info!(
                page_id = %self.page_id,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                attempt = backoff.attempts(),
                "reconnect scheduled"
            );

            tokio::select! {
                () = self.token.cancelled() => return,
                () = tokio::time::sleep(delay) => {}
            }
        }
    }
}

/// Keyed registry of stream sessions: at most one live connection per page.
///
/// Owns the caches every session's router writes into, and the read
/// interface UI consumers query.
#[derive(Debug)]
pub struct StreamManager {
    transport: Arc<dyn StreamTransport>,
    threads: ConversationCache,
    summaries: ConversationListCache,
    sessions: RwLock<HashMap<PageId, Arc<ConnectionSession>>>,
}

impl StreamManager {
    /// Manager with fresh caches over the given transport.
    #[must_use]
    pub fn new(transport: Arc<dyn StreamTransport>) -> Self {
        Self {
            transport,
            threads: ConversationCache::new(),
            summaries: ConversationListCache::new(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Per-conversation message cache (read interface).
    #[must_use]
    pub fn threads(&self) -> &ConversationCache {
        &self.threads
    }

    /// Per-page summary cache (read interface).
    #[must_use]
    pub fn summaries(&self) -> &ConversationListCache {
        &self.summaries
    }

    /// Opens a connection for `page_id`, or returns the existing one.
    ///
    /// Idempotent start: rapid re-invocation never produces duplicate
    /// connections for the same page. A session that went terminal (budget
    /// exhausted, or closed) is replaced with a fresh one.
    pub async fn subscribe(&self, page_id: PageId) -> Arc<ConnectionSession> {
        let mut sessions = self.sessions.write().await;
        if let Some(existing) = sessions.get(&page_id)
            && existing.phase() != ConnectionPhase::Closed
        {
            return Arc::clone(existing);
        }

        let router = Arc::new(EventRouter::new(
            page_id.clone(),
            self.threads.clone(),
            self.summaries.clone(),
        ));
        let session = ConnectionSession::new(page_id.clone(), Arc::clone(&self.transport), router);
        session.open();
        sessions.insert(page_id, Arc::clone(&session));
        session
    }

    /// Tears down and forgets the connection for `page_id`, if any.
    pub async fn unsubscribe(&self, page_id: &PageId) {
        if let Some(session) = self.sessions.write().await.remove(page_id) {
            session.close();
        }
    }

    /// Live session for `page_id`, if subscribed.
    pub async fn session(&self, page_id: &PageId) -> Option<Arc<ConnectionSession>> {
        self.sessions.read().await.get(page_id).cloned()
    }
}

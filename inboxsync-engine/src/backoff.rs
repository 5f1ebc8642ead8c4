use std::time::Duration;

/// Reconnect attempts allowed before a session goes terminal.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

const BASE_DELAY_MS: u64 = 1_000;
const MAX_DELAY_MS: u64 = 30_000;

/// Delay before retry number `attempt` (0-indexed): `min(1000 * 2^attempt, 30000)` ms.
#[must_use]
pub fn delay_for_attempt(attempt: u32) -> Duration {
    let factor = 1_u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let millis = BASE_DELAY_MS.saturating_mul(factor).min(MAX_DELAY_MS);
    Duration::from_millis(millis)
}

/// Bounded exponential backoff state for one stream connection.
///
/// Only a successful open resets the counter; a transient error mid-backoff
/// keeps whatever progress the counter has made.
#[derive(Debug, Default)]
pub struct ReconnectBackoff {
    attempts: u32,
}

impl ReconnectBackoff {
    /// Fresh backoff with zero recorded attempts.
    #[must_use]
    pub const fn new() -> Self {
        Self { attempts: 0 }
    }

    /// Attempts consumed so far.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether the attempt budget is spent.
    #[must_use]
    pub const fn exhausted(&self) -> bool {
        self.attempts >= MAX_RECONNECT_ATTEMPTS
    }

    /// Next delay to sleep before reconnecting, or `None` once exhausted.
    ///
    /// Consumes one attempt when a delay is returned.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.exhausted() {
            return None;
        }
        let delay = delay_for_attempt(self.attempts);
        self.attempts += 1;
        Some(delay)
    }

    /// Clears the counter. Called on successful open only.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

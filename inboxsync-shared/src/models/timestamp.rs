use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// RFC 3339 timestamp as issued by the messaging backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub DateTime<Utc>);

impl Timestamp {
    /// Current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Absolute distance to `other` in milliseconds.
    ///
    /// Used by the reconciliation window check, which compares locally-stamped
    /// placeholders against backend-stamped messages in either order.
    #[must_use]
    pub fn millis_between(self, other: Self) -> i64 {
        self.0.signed_duration_since(other.0).num_milliseconds().abs()
    }

    /// Milliseconds since the Unix epoch, as used in placeholder ids.
    #[must_use]
    pub fn epoch_millis(self) -> i64 {
        self.0.timestamp_millis()
    }
}

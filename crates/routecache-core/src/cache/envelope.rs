use chrono::Duration;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

/// A cached payload and the time it was saved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEnvelope<T> {
    pub version: u32,
    pub payload: T,
    /// Milliseconds since the Unix epoch
    pub saved_at: i64,
}

impl<T> CacheEnvelope<T> {
    /// Bumped when a cached payload changes shape incompatibly.
    pub const VERSION: u32 = 1;

    pub fn new(payload: T, saved_at: i64) -> Self {
        Self {
            version: Self::VERSION,
            payload,
            saved_at,
        }
    }

    /// Strictly older than `ttl`. An entry exactly `ttl` old is still valid.
    pub fn is_expired(&self, now_millis: i64, ttl: Duration) -> bool {
        is_older_than(self.saved_at, now_millis, ttl)
    }

    pub fn into_payload(self) -> T {
        self.payload
    }
}

impl<T: DeserializeOwned> CacheEnvelope<T> {
    /// Decode a stored envelope. Anything that does not decode as the
    /// current version yields `None`.
    pub fn decode(raw: &str) -> Option<Self> {
        let envelope: Self = match serde_json::from_str(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(error = %e, "Cache envelope failed to decode");
                return None;
            }
        };
        if envelope.version != Self::VERSION {
            debug!(
                found = envelope.version,
                expected = Self::VERSION,
                "Cache envelope version mismatch"
            );
            return None;
        }
        Some(envelope)
    }
}

const MILLIS_PER_HOUR: i64 = 3_600_000;

/// `now - saved > ttl`, the expiry rule shared by every cache. An age that
/// does not fit in an `i64` (a corrupt timestamp) counts as expired.
pub(crate) fn is_older_than(saved_at: i64, now_millis: i64, ttl: Duration) -> bool {
    match now_millis.checked_sub(saved_at) {
        Some(age) => age > ttl.num_milliseconds(),
        None => true,
    }
}

/// A TTL of `hours`, saturating at the largest representable span instead
/// of overflowing.
pub(crate) fn hours_ttl(hours: i64) -> Duration {
    Duration::milliseconds(hours.saturating_mul(MILLIS_PER_HOUR).max(-i64::MAX))
}

/// Human-readable age, e.g. "5m ago" or "2h ago".
pub fn age_display(age_millis: i64) -> String {
    let minutes = age_millis / 60_000;
    if minutes < 1 {
        // Also covers clock skew
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        if minutes % 60 >= 30 {
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        if (minutes % 1440) / 60 >= 12 {
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}

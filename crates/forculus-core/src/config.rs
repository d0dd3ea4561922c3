// ── Runtime watch configuration ──
//
// Timing and sizing knobs for the bus and the watchers. Built by the
// binary from the loaded config file; core never reads config files.

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::bus::DEFAULT_MAILBOX_CAPACITY;

/// Timing and capacity settings shared by the watchers and the reactor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchConfig {
    /// How often both watchers poll.
    pub poll_interval: Duration,
    /// How far before an alert exit a watch window starts.
    pub event_lookback: Duration,
    /// How long an event id stays in the dedup cache.
    pub seen_event_ttl: Duration,
    /// Look-back of the startup query that seeds the dedup cache.
    pub bootstrap_window: Duration,
    /// Delay between failed bootstrap attempts.
    pub bootstrap_retry: Duration,
    /// Capacity of each subscription's mailbox.
    pub mailbox_capacity: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            event_lookback: Duration::from_secs(30),
            seen_event_ttl: Duration::from_secs(30 * 60),
            bootstrap_window: Duration::from_secs(30 * 60),
            bootstrap_retry: Duration::from_secs(5),
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

/// Convert for wall-clock arithmetic, saturating on absurd values.
pub(crate) fn time_delta(duration: Duration) -> TimeDelta {
    TimeDelta::from_std(duration).unwrap_or(TimeDelta::MAX)
}

/// `now - span`, clamped to the earliest representable instant.
pub(crate) fn reach_back(now: DateTime<Utc>, span: TimeDelta) -> DateTime<Utc> {
    now.checked_sub_signed(span).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

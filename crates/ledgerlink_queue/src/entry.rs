//! Queue entries and the retry backoff policy.

use ledgerlink_protocol::{DomainRecord, Fingerprint};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Why an entry left the pending set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalKind {
    /// The engine accepted the whole entry.
    Succeeded,
    /// The engine accepted part of the entry; replaying it would duplicate
    /// the accepted items, so the entry is retired as-is.
    PartiallyAccepted,
    /// The engine definitively rejected the entry.
    Rejected,
    /// An operator cancelled the entry before delivery.
    Cancelled,
}

/// One queued business event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    /// Monotonic sequence number; replay order.
    pub seq: u64,
    /// The record to deliver.
    pub record: DomainRecord,
    /// Content fingerprint used for duplicate suppression.
    pub fingerprint: Fingerprint,
    /// Wall-clock enqueue time, milliseconds since the Unix epoch.
    pub enqueued_at_ms: u64,
    /// Delivery attempts made so far.
    pub attempts: u32,
    /// Time of the most recent attempt, when one has been made.
    pub last_attempt_ms: Option<u64>,
    /// Earliest time the next attempt may run.
    pub next_retry_ms: u64,
    /// Set once the entry is retired.
    pub terminal: Option<TerminalKind>,
}

impl QueueEntry {
    /// True while the entry still awaits delivery.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.terminal.is_none()
    }

    /// True if the entry may be attempted at `now_ms`.
    #[must_use]
    pub fn is_eligible(&self, now_ms: u64) -> bool {
        self.is_pending() && self.next_retry_ms <= now_ms
    }
}

/// Exponential backoff between delivery attempts of one entry.
///
/// The delay doubles with each failed attempt and is capped. There is no
/// jitter: entries are replayed serially by one drain loop, so thundering
/// herds cannot occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Delay after the first failed attempt.
    pub base: Duration,
    /// Upper bound on the delay.
    pub cap: Duration,
}

impl BackoffPolicy {
    /// Creates a policy with the given base and cap.
    #[must_use]
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self { base, cap }
    }

    /// Delay to wait after the given number of failed attempts.
    ///
    /// Attempt counts start at 1; zero is treated as 1.
    #[must_use]
    pub fn delay_for(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(32);
        let factor = 1u64 << exponent;
        let base_ms = self.base.as_millis() as u64;
        let delay_ms = base_ms.saturating_mul(factor);
        Duration::from_millis(delay_ms).min(self.cap)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(5),
            cap: Duration::from_secs(300),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = BackoffPolicy::new(Duration::from_secs(1), Duration::from_secs(8));
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(4), Duration::from_secs(8));
        assert_eq!(policy.delay_for(5), Duration::from_secs(8));
        assert_eq!(policy.delay_for(100), Duration::from_secs(8));
    }

    #[test]
    fn backoff_is_non_decreasing() {
        let policy = BackoffPolicy::default();
        let mut previous = Duration::ZERO;
        for attempts in 1..40 {
            let delay = policy.delay_for(attempts);
            assert!(delay >= previous);
            assert!(delay <= policy.cap);
            previous = delay;
        }
    }

    #[test]
    fn zero_attempts_behaves_like_one() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for(0), policy.delay_for(1));
    }
}

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, SecondsFormat, Utc};

/// Source of wall-clock time for record timestamps.
///
/// Every timestamp written by the ledger (`createDate`, audit entries, store
/// history) is taken from a `Clock` so that tests can pin time down.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> DateTime<Utc>;

    /// The current instant rendered with [`format_timestamp`].
    fn timestamp(&self) -> String {
        format_timestamp(&self.now())
    }
}

/// Render a timestamp as RFC 3339 UTC with millisecond precision.
///
/// The fixed width keeps lexicographic order equal to chronological order,
/// which the `broker~createDate` index relies on.
pub fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The operating system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A deterministic clock for tests and replays.
///
/// Each call to [`Clock::now`] returns the current reading and then advances
/// it by `step_ms`, so successive timestamps are strictly increasing.
pub struct ManualClock {
    millis: AtomicI64,
    step_ms: i64,
}

impl ManualClock {
    /// Start at `start_ms` (milliseconds since the UNIX epoch), advancing 1ms per reading.
    pub fn new(start_ms: i64) -> Self {
        Self::with_step(start_ms, 1)
    }

    /// Start at `start_ms`, advancing `step_ms` per reading.
    pub fn with_step(start_ms: i64, step_ms: i64) -> Self {
        Self {
            millis: AtomicI64::new(start_ms),
            step_ms,
        }
    }

    /// Move the clock forward without taking a reading.
    pub fn advance(&self, ms: i64) {
        self.millis.fetch_add(ms, Ordering::SeqCst);
    }

    /// The next reading, without consuming it.
    pub fn peek_ms(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let ms = self.millis.fetch_add(self.step_ms, Ordering::SeqCst);
        DateTime::from_timestamp_millis(ms).unwrap_or_default()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        // 2024-01-01T00:00:00Z
        Self::new(1_704_067_200_000)
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock")
            .field("next_ms", &self.peek_ms())
            .field("step_ms", &self.step_ms)
            .finish()
    }
}

use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Source of the current wall-clock time in epoch milliseconds.
///
/// The clock engine and the session layer only ever see time through this
/// trait, so debounce and staleness behavior can be tested without real
/// delays.
pub trait TimeSource {
    fn now_ms(&self) -> i64;
}

/// Production time source backed by the system wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl TimeSource for WallClock {
    fn now_ms(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Manually advanced time source for unit tests.
///
/// Clones share the same underlying instant, so a test can hold one handle
/// while a session owns another.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<AtomicI64>,
}

impl ManualClock {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    pub fn set(&self, ms: i64) {
        self.now.store(ms, Ordering::Relaxed);
    }

    pub fn advance(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::Relaxed);
    }
}

impl TimeSource for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wall_clock_is_plausible() {
        // Anything after 2020-01-01 counts as a sane wall clock
        assert!(WallClock.now_ms() > 1_577_836_800_000);
    }

    #[test]
    fn test_manual_clock_set_and_advance() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_ms(), 1_000);

        clock.advance(250);
        assert_eq!(clock.now_ms(), 1_250);

        clock.set(5_000);
        assert_eq!(clock.now_ms(), 5_000);
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::new(0);
        let handle = clock.clone();

        handle.advance(100);
        assert_eq!(clock.now_ms(), 100);
    }
}

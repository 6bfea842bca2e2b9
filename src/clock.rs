use std::fmt;

/// Minimum interval between consecutive accepted start/stop actions.
/// Absorbs accidental double-taps on the main control.
pub const DEBOUNCE_GUARD_MS: i64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockError {
    /// Start/stop arrived inside the guard window of the previous action
    Debounced,
    AlreadyRunning,
    NotRunning,
    /// The wall clock moved behind the start epoch; elapsed time was left as-is
    Skew,
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockError::Debounced => write!(f, "ignored: too soon after the last start/stop"),
            ClockError::AlreadyRunning => write!(f, "timer is already running"),
            ClockError::NotRunning => write!(f, "timer is not running"),
            ClockError::Skew => write!(f, "system clock moved backwards; time not updated"),
        }
    }
}

impl std::error::Error for ClockError {}

/// The single shared race clock.
///
/// Elapsed time accumulates across stop/resume cycles: starting after a stop
/// continues from the frozen value rather than resetting it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaceClock {
    running: bool,
    start_epoch_ms: Option<i64>,
    elapsed_ms: i64,
    last_action_ms: Option<i64>,
}

impl RaceClock {
    pub fn new() -> Self {
        Self {
            running: false,
            start_epoch_ms: None,
            elapsed_ms: 0,
            last_action_ms: None,
        }
    }

    pub fn running(&self) -> bool {
        self.running
    }

    /// Last computed elapsed time. Authoritative while stopped, a cache
    /// refreshed by `tick` while running.
    pub fn elapsed_ms(&self) -> i64 {
        self.elapsed_ms
    }

    pub fn start_epoch_ms(&self) -> Option<i64> {
        self.start_epoch_ms
    }

    /// Elapsed time as of `now`, without mutating the cached value.
    /// Falls back to the cache if the wall clock went backwards.
    pub fn current_elapsed(&self, now: i64) -> i64 {
        match self.start_epoch_ms {
            Some(start) if self.running => {
                let elapsed = now - start;
                if elapsed < 0 {
                    self.elapsed_ms
                } else {
                    elapsed
                }
            }
            _ => self.elapsed_ms,
        }
    }

    fn check_guard(&self, now: i64) -> Result<(), ClockError> {
        if let Some(last) = self.last_action_ms {
            if now - last < DEBOUNCE_GUARD_MS {
                return Err(ClockError::Debounced);
            }
        }
        Ok(())
    }

    /// Start (or resume) the clock. Legal only while stopped.
    pub fn start(&mut self, now: i64) -> Result<(), ClockError> {
        self.check_guard(now)?;
        if self.running {
            return Err(ClockError::AlreadyRunning);
        }
        self.start_epoch_ms = Some(now - self.elapsed_ms);
        self.running = true;
        self.last_action_ms = Some(now);
        Ok(())
    }

    /// Stop the clock, freezing the elapsed time. Legal only while running.
    pub fn stop(&mut self, now: i64) -> Result<(), ClockError> {
        self.check_guard(now)?;
        if !self.running {
            return Err(ClockError::NotRunning);
        }
        self.elapsed_ms = self.current_elapsed(now);
        self.running = false;
        self.start_epoch_ms = None;
        self.last_action_ms = Some(now);
        Ok(())
    }

    /// Refresh the cached elapsed time. Never transitions state; a no-op
    /// while stopped. A negative computed elapsed leaves the cache untouched
    /// and reports `Skew`.
    pub fn tick(&mut self, now: i64) -> Result<i64, ClockError> {
        match self.start_epoch_ms {
            Some(start) if self.running => {
                let elapsed = now - start;
                if elapsed < 0 {
                    return Err(ClockError::Skew);
                }
                self.elapsed_ms = elapsed;
                Ok(elapsed)
            }
            _ => Ok(self.elapsed_ms),
        }
    }

    /// Recompute immediately after the host regains foreground. Background
    /// ticking may have been suspended, so the cache can be far behind.
    pub fn visibility_resume(&mut self, now: i64) -> Result<i64, ClockError> {
        self.tick(now)
    }

    /// Return to the initial state unconditionally. Not debounced: the
    /// caller confirms destructive resets itself.
    pub fn reset(&mut self) {
        self.running = false;
        self.start_epoch_ms = None;
        self.elapsed_ms = 0;
        self.last_action_ms = None;
    }

    /// Rebuild state from a persisted snapshot. A snapshot that was running
    /// keeps running: the start epoch is recomputed against `now` so the
    /// clock continues counting from the saved elapsed value.
    pub fn restore(&mut self, running: bool, elapsed_ms: i64, now: i64) {
        let elapsed = elapsed_ms.max(0);
        self.elapsed_ms = elapsed;
        self.running = running;
        self.start_epoch_ms = if running { Some(now - elapsed) } else { None };
        self.last_action_ms = None;
    }
}

impl Default for RaceClock {
    fn default() -> Self {
        Self::new()
    }
}

use crate::clock::{ClockError, RaceClock};
use crate::notice::NoticeBoard;
use crate::roster::{CheckpointKey, NameError, Participant, RecordError, Roster};
use crate::snapshot::SessionSnapshot;
use crate::store::{FileSlotStore, SlotStore};
use crate::time_source::{TimeSource, WallClock};

/// Write-debounce for tick-driven autosaves, so a 100ms display tick does
/// not turn into a write storm.
pub const AUTOSAVE_DEBOUNCE_MS: i64 = 500;

/// The orchestration surface the UI layer drives.
///
/// Owns the live clock and roster; the store only ever sees serialized
/// bytes. Persistence is best-effort and never rolls back an in-memory
/// mutation.
#[derive(Debug)]
pub struct RaceSession<S: SlotStore, T: TimeSource> {
    clock: RaceClock,
    roster: Roster,
    notices: NoticeBoard,
    store: S,
    time: T,
    last_save_ms: Option<i64>,
}

impl RaceSession<FileSlotStore, WallClock> {
    /// Session backed by the default on-disk slot and the system clock
    pub fn open() -> Self {
        Self::new(FileSlotStore::new(), WallClock)
    }
}

impl<S: SlotStore, T: TimeSource> RaceSession<S, T> {
    pub fn new(store: S, time: T) -> Self {
        Self {
            clock: RaceClock::new(),
            roster: Roster::new(),
            notices: NoticeBoard::new(),
            store,
            time,
            last_save_ms: None,
        }
    }

    pub fn clock(&self) -> &RaceClock {
        &self.clock
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn elapsed_ms(&self) -> i64 {
        self.clock.elapsed_ms()
    }

    /// The transient notice currently inside its display window, if any
    pub fn active_notice(&self) -> Option<&str> {
        self.notices
            .active(self.time.now_ms())
            .map(|n| n.message.as_str())
    }

    /// Restore a persisted session if one exists, is recent, and is
    /// structurally valid. Anything else wipes the slot and starts clean.
    /// Returns whether a session was restored.
    pub fn on_load(&mut self) -> bool {
        let now = self.time.now_ms();
        let raw = match self.store.read() {
            Some(raw) => raw,
            None => return false,
        };

        let snapshot = match SessionSnapshot::decode(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                eprintln!("warning: discarding stored session: {}", e);
                self.store.erase();
                return false;
            }
        };

        if !snapshot.is_recent(now) {
            if let Some(when) = snapshot.saved_at() {
                eprintln!("warning: discarding stale session saved {}", when.to_rfc3339());
            }
            self.store.erase();
            return false;
        }

        self.roster = snapshot.to_roster();
        self.clock.restore(
            snapshot.timer_state.is_running,
            snapshot.timer_state.elapsed_time,
            now,
        );
        true
    }

    /// Validate and append a participant. Validation failures are returned
    /// inline and leave the roster untouched.
    pub fn add_participant(&mut self, name: &str) -> Result<Participant, NameError> {
        let participant = self.roster.add(name)?;
        self.save_now();
        Ok(participant)
    }

    /// Record the clock's current elapsed time as a split. The recorded
    /// value is always taken from the clock, never chosen by the caller.
    /// Returns the recorded elapsed on success.
    pub fn record_checkpoint(
        &mut self,
        participant_id: &str,
        key: CheckpointKey,
    ) -> Result<i64, RecordError> {
        let now = self.time.now_ms();
        if !self.clock.running() {
            self.notices.raise(RecordError::TimerNotRunning.to_string(), now);
            return Err(RecordError::TimerNotRunning);
        }

        let elapsed = self.clock.current_elapsed(now);
        match self.roster.record(participant_id, key, elapsed) {
            Ok(()) => {
                self.save_now();
                Ok(elapsed)
            }
            Err(e) => {
                self.notices.raise(e.to_string(), now);
                Err(e)
            }
        }
    }

    pub fn start(&mut self) -> Result<(), ClockError> {
        let now = self.time.now_ms();
        match self.clock.start(now) {
            Ok(()) => {
                self.save_now();
                Ok(())
            }
            Err(e) => {
                self.notices.raise(e.to_string(), now);
                Err(e)
            }
        }
    }

    pub fn stop(&mut self) -> Result<(), ClockError> {
        let now = self.time.now_ms();
        match self.clock.stop(now) {
            Ok(()) => {
                self.save_now();
                Ok(())
            }
            Err(e) => {
                self.notices.raise(e.to_string(), now);
                Err(e)
            }
        }
    }

    /// Advance the displayed elapsed time. Autosaves on the write-debounce
    /// cadence while running. Clock skew is reported as a notice and the
    /// previous elapsed value is returned.
    pub fn tick(&mut self) -> i64 {
        let now = self.time.now_ms();
        match self.clock.tick(now) {
            Ok(elapsed) => {
                if self.clock.running() {
                    self.save_debounced(now);
                }
                elapsed
            }
            Err(e) => {
                self.notices.raise(e.to_string(), now);
                self.clock.elapsed_ms()
            }
        }
    }

    /// Recompute elapsed time immediately after the host regains
    /// foreground, bypassing the tick cadence.
    pub fn visibility_resume(&mut self) -> i64 {
        let now = self.time.now_ms();
        match self.clock.visibility_resume(now) {
            Ok(elapsed) => elapsed,
            Err(e) => {
                self.notices.raise(e.to_string(), now);
                self.clock.elapsed_ms()
            }
        }
    }

    /// Wipe everything: clock, roster, notices, and the persisted slot.
    /// Callers confirm this destructively themselves; it always succeeds.
    pub fn reset(&mut self) {
        self.clock.reset();
        self.roster.reset_all();
        self.notices.clear();
        self.store.erase();
        self.last_save_ms = None;
    }

    /// Debounced best-effort persistence hook for the UI to call after any
    /// mutation it performs through other means. Returns whether a write
    /// happened.
    pub fn on_change(&mut self) -> bool {
        let now = self.time.now_ms();
        self.save_debounced(now)
    }

    /// Persist immediately, ignoring the write-debounce. For teardown.
    pub fn flush(&mut self) -> bool {
        self.save_now()
    }

    fn save_now(&mut self) -> bool {
        let now = self.time.now_ms();
        self.persist(now)
    }

    fn save_debounced(&mut self, now: i64) -> bool {
        if let Some(last) = self.last_save_ms {
            if now - last < AUTOSAVE_DEBOUNCE_MS {
                return false;
            }
        }
        self.persist(now)
    }

    fn persist(&mut self, now: i64) -> bool {
        let snapshot = SessionSnapshot::capture(&self.roster, &self.clock, now);
        match snapshot.encode() {
            Ok(raw) => {
                let written = self.store.write(&raw);
                if written {
                    self.last_save_ms = Some(now);
                }
                written
            }
            Err(e) => {
                eprintln!("warning: session not saved: {}", e);
                false
            }
        }
    }
}

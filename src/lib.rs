// Library surface for the race timing core. The UI layer drives everything
// through race::RaceSession; keep this lean and frontend-agnostic.
pub mod clock;
pub mod notice;
pub mod race;
pub mod roster;
pub mod roster_io;
pub mod runtime;
pub mod snapshot;
pub mod store;
pub mod time_source;
pub mod util;

/// Cadence of the display tick while the clock is running.
pub const TICK_RATE_MS: u64 = 100;

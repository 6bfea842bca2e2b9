use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Unified event type consumed by the session driver
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RaceEvent {
    /// Periodic display refresh while the clock runs
    Tick,
    /// The host regained foreground after being backgrounded
    VisibilityResumed,
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for FixedTicker {
    /// The production display cadence
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::TICK_RATE_MS))
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Handle to a repeating tick task.
///
/// Whoever owns the Running transition holds this and cancels it on
/// stop/reset/teardown, so no tick can arrive after state says stopped.
/// Dropping the handle cancels too.
#[derive(Debug)]
pub struct TickHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl TickHandle {
    /// Spawn a background task sending `RaceEvent::Tick` on `tx` at the
    /// ticker's cadence until cancelled or the receiver goes away.
    pub fn spawn<T: Ticker>(ticker: T, tx: Sender<RaceEvent>) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);

        let thread = std::thread::spawn(move || loop {
            std::thread::sleep(ticker.interval());
            if flag.load(Ordering::Relaxed) {
                break;
            }
            if tx.send(RaceEvent::Tick).is_err() {
                break;
            }
        });

        Self {
            stop,
            thread: Some(thread),
        }
    }

    /// Stop the task and wait for it to wind down. No ticks are delivered
    /// after this returns.
    pub fn cancel(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

//! The monotonic tick driving every polling state machine.

use std::time::{Duration, Instant};

/// Default tick period. Everything that polls does so at this rhythm.
pub const TICK_PERIOD: Duration = Duration::from_millis(50);

/// A fixed-period monotonic ticker.
///
/// `wait` sleeps until the next slot and returns the tick number. Slots
/// are anchored to the start time, so a slow tick is followed by shorter
/// sleeps rather than drift; slots missed entirely are skipped.
pub struct Ticker {
    period: Duration,
    started: Instant,
    count: u64,
}

impl Ticker {
    /// A ticker firing every `period`.
    pub fn new(period: Duration) -> Ticker {
        Ticker {
            period,
            started: Instant::now(),
            count: 0,
        }
    }

    /// Blocks until the next tick; returns the tick number, starting at 1.
    pub fn wait(&mut self) -> u64 {
        self.count += 1;
        let due = self.started + self.period * self.count as u32;
        let now = Instant::now();
        if due > now {
            std::thread::sleep(due - now);
        } else {
            // Fell behind; realign on the next slot that is still ahead.
            let behind = now.duration_since(self.started).as_nanos()
                / self.period.as_nanos().max(1);
            self.count = behind as u64 + 1;
        }
        self.count
    }

    /// Ticks elapsed so far.
    pub fn count(&self) -> u64 {
        self.count
    }
}

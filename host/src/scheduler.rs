//! Frame-gated tick scheduling
//!
//! The host is polled once per rendered frame and ticks only when a full
//! tick interval has passed since the previous tick. Time is passed in
//! rather than read, so the simulation can be driven without a clock.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct TickScheduler {
    interval: Duration,
    last_tick: Option<Instant>,
}

impl TickScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_tick: None,
        }
    }

    /// Marks `now` as the reference point for the next tick
    pub fn start(&mut self, now: Instant) {
        self.last_tick = Some(now);
    }

    /// Returns true when a tick is due at `now` and records it.
    ///
    /// At most one tick is reported per call, however many intervals were
    /// missed; an unstarted scheduler starts itself and reports nothing.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.last_tick {
            Some(last) if now.saturating_duration_since(last) >= self.interval => {
                self.last_tick = Some(now);
                true
            }
            Some(_) => false,
            None => {
                self.last_tick = Some(now);
                false
            }
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_started(&self) -> bool {
        self.last_tick.is_some()
    }
}

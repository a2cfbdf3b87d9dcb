//! Fixed-interval poll scheduler.
//!
//! Fires on a fixed cadence with a jittered first tick. When the poll body
//! runs long (or the runtime stalls), missed ticks are skipped and the next
//! one is scheduled from *now*, never replayed in a burst.

use tokio::time::{self, Duration, Instant};
use tracing::{debug, trace, warn};

use rand::Rng;

use crate::PollConfig;

/// Returned by [`PollScheduler::wait_for_tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTick {
    /// Monotonically increasing, starting at 1.
    pub tick: u64,
    /// `true` if this tick fired more than 10% of an interval late.
    pub overrun: bool,
    /// Whole intervals that were skipped because of the delay.
    pub ticks_skipped: u64,
}

/// Drives the presence poll loop.
pub struct PollScheduler {
    interval: Duration,
    next_tick: Instant,
    tick_count: u64,
}

impl PollScheduler {
    pub fn new(config: PollConfig) -> Self {
        let config = config.validated();

        let jitter = if config.initial_jitter.is_zero() {
            Duration::ZERO
        } else {
            let max = config.initial_jitter.as_millis() as u64;
            Duration::from_millis(rand::rng().random_range(0..=max))
        };

        debug!(
            interval_ms = config.poll_interval.as_millis() as u64,
            jitter_ms = jitter.as_millis() as u64,
            "poll scheduler created"
        );

        Self {
            interval: config.poll_interval,
            next_tick: Instant::now() + config.poll_interval + jitter,
            tick_count: 0,
        }
    }

    /// Waits until the next poll is due.
    pub async fn wait_for_tick(&mut self) -> PollTick {
        let due = self.next_tick;
        time::sleep_until(due).await;

        let now = Instant::now();
        self.tick_count += 1;

        let late_by = now.saturating_duration_since(due);
        let overrun = late_by > self.interval / 10;
        let mut ticks_skipped = 0;
        if overrun {
            ticks_skipped = (late_by.as_nanos() / self.interval.as_nanos()) as u64;
            if ticks_skipped > 0 {
                warn!(
                    tick = self.tick_count,
                    skipped = ticks_skipped,
                    late_ms = late_by.as_millis() as u64,
                    "presence poll overrun, skipping ahead"
                );
            }
        }
        self.next_tick = now + self.interval;

        trace!(tick = self.tick_count, overrun, "poll tick");

        PollTick {
            tick: self.tick_count,
            overrun,
            ticks_skipped,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

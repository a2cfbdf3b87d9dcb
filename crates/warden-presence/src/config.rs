use std::time::Duration;

use tracing::warn;

/// Presence poll settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Time between two snapshots of the host's live connections.
    pub poll_interval: Duration,
    /// Upper bound of the random delay added before the first poll.
    pub initial_jitter: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            poll_interval: Self::DEFAULT_INTERVAL,
            initial_jitter: Duration::from_millis(500),
        }
    }
}

impl PollConfig {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);
    pub const MIN_INTERVAL: Duration = Duration::from_millis(100);
    pub const MAX_INTERVAL: Duration = Duration::from_secs(3600);

    pub fn with_interval(poll_interval: Duration) -> Self {
        Self {
            poll_interval,
            ..Default::default()
        }
    }

    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`PollScheduler::new`](crate::PollScheduler::new).
    /// - `poll_interval` clamped to [`Self::MIN_INTERVAL`]`..=`[`Self::MAX_INTERVAL`].
    /// - `initial_jitter` capped to one `poll_interval`.
    pub fn validated(mut self) -> Self {
        let clamped = self
            .poll_interval
            .clamp(Self::MIN_INTERVAL, Self::MAX_INTERVAL);
        if clamped != self.poll_interval {
            warn!(
                requested_ms = self.poll_interval.as_millis() as u64,
                clamped_ms = clamped.as_millis() as u64,
                "poll_interval out of range, clamping"
            );
            self.poll_interval = clamped;
        }
        if self.initial_jitter > self.poll_interval {
            self.initial_jitter = self.poll_interval;
        }
        self
    }
}

//! Notifier configuration.

use std::time::Duration;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Where notifications go and how hard to try.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    /// Endpoint for single-event notifications. `None` disables delivery.
    pub supervisor_url: Option<String>,

    /// Endpoint for roster pushes. Falls back to `supervisor_url`.
    pub reconcile_url: Option<String>,

    pub retry: RetryPolicy,

    pub connect_timeout: Duration,

    /// Whole-request timeout, per attempt.
    pub request_timeout: Duration,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            supervisor_url: None,
            reconcile_url: None,
            retry: RetryPolicy::default(),
            connect_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(5),
        }
    }
}

impl NotifyConfig {
    /// Config that delivers to `url` with default retry and timeouts.
    pub fn with_supervisor(url: impl Into<String>) -> Self {
        Self {
            supervisor_url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Where roster pushes are sent.
    pub fn roster_url(&self) -> Option<&str> {
        self.reconcile_url
            .as_deref()
            .or(self.supervisor_url.as_deref())
    }
}

/// Bounded retry with linear backoff.
///
/// A delivery makes at most `max_retries + 1` attempts. After the n-th
/// failed attempt the worker sleeps `base_delay * n` before trying again.
///
/// ```text
/// attempt 1 ─ fail ─ sleep 1×base ─ attempt 2 ─ fail ─ sleep 2×base ─ attempt 3 …
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Total number of attempts, first try included.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// How long to wait after `failed_attempt` (1-based) fails.
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        self.base_delay.saturating_mul(failed_attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_after_grows_linearly() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(250),
        };
        assert_eq!(policy.delay_after(1), Duration::from_millis(250));
        assert_eq!(policy.delay_after(2), Duration::from_millis(500));
        assert_eq!(policy.delay_after(3), Duration::from_millis(750));
        assert_eq!(policy.max_attempts(), 4);
    }

    #[test]
    fn test_roster_url_falls_back_to_supervisor() {
        let mut config = NotifyConfig::with_supervisor("http://sup/events");
        assert_eq!(config.roster_url(), Some("http://sup/events"));

        config.reconcile_url = Some("http://sup/reconcile".into());
        assert_eq!(config.roster_url(), Some("http://sup/reconcile"));

        assert_eq!(NotifyConfig::default().roster_url(), None);
    }
}

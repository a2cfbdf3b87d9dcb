//! Error types for outbound notifications.

/// Errors from delivering a notification to the supervisor.
///
/// None of these ever reach the code that asked for the notification;
/// they are logged by the delivery worker and dropped.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The HTTP client couldn't be built or the request failed in transit
    /// (connect error, timeout, TLS).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The supervisor answered with a non-2xx status.
    #[error("supervisor responded with HTTP {0}")]
    Status(u16),

    /// Every attempt failed.
    #[error("gave up after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },
}

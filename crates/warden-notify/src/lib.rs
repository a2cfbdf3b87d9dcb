//! Best-effort supervisor notifications for Warden.
//!
//! The [`Notifier`] is a cheap handle that queues events; a background
//! worker POSTs them as JSON to the configured supervisor with bounded,
//! linearly backed-off retries. Delivery failures are logged once and
//! dropped; nothing here can fail or block the code that asked for the
//! notification.

mod config;
mod error;
mod notifier;

pub use config::{DEFAULT_MAX_RETRIES, NotifyConfig, RetryPolicy};
pub use error::NotifyError;
pub use notifier::{Dispatch, Notifier, deliver};

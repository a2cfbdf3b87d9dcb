//! Presence polling for Warden.
//!
//! The host's own connect/quit callbacks can't be fully trusted (they may
//! be missed at startup, or a crash may skip the quit). The presence
//! poller is the safety net: on a fixed interval it snapshots the host's
//! live connections and diffs against the previous snapshot.
//!
//! - [`PresenceTracker`] — the two-snapshot diff, no I/O, no clocks
//! - [`PollScheduler`] — the fixed-interval timer that drives it
//!
//! # Integration
//!
//! ```ignore
//! let mut scheduler = PollScheduler::new(PollConfig::default());
//! let mut tracker = PresenceTracker::new();
//! loop {
//!     tokio::select! {
//!         _ = shutdown.changed() => break,
//!         _ = scheduler.wait_for_tick() => {
//!             let diff = tracker.tick(host_live_connections());
//!             for gone in diff.disconnected { /* deauthorize + notify */ }
//!         }
//!     }
//! }
//! ```

mod config;
mod schedule;
mod tracker;

pub use config::PollConfig;
pub use schedule::{PollScheduler, PollTick};
pub use tracker::{Departure, LiveConnection, PresenceDiff, PresenceTracker};

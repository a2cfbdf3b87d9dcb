//! JSON shapes exchanged with tooling outside the process.
//!
//! Two audiences:
//! - the **supervisor**, which receives event and reconciliation POSTs
//! - whoever polls the **status endpoint** (`GET /online`)
//!
//! Field names here are the external contract; renaming a Rust field
//! without a `#[serde(rename)]` breaks the supervisor.

use serde::{Deserialize, Serialize};

/// Name reported for a live connection that isn't bound to an account.
pub const NOT_LOGGED_IN: &str = "Not-Logged";

/// Which transition a supervisor notification reports.
///
/// Serialized in lowercase: `"connected"`, `"logged"`, `"deauthorize"`,
/// `"reconcile"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyEvent {
    /// A connection joined the world (not yet authenticated).
    Connected,
    /// A connection authenticated as an account.
    Logged,
    /// A connection lost its account binding (logout or disconnect).
    Deauthorize,
    /// Full roster snapshot.
    Reconcile,
}

impl NotifyEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Logged => "logged",
            Self::Deauthorize => "deauthorize",
            Self::Reconcile => "reconcile",
        }
    }
}

impl std::fmt::Display for NotifyEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a single-event notification.
///
/// ```json
/// {"event":"logged","player":"alice","ip":"10.0.0.5","timestamp":1700000000000}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPayload {
    pub event: NotifyEvent,
    /// Account name, or empty when the connection was never bound.
    pub player: String,
    pub ip: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// One name/address pair in a roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub name: String,
    pub ip: String,
}

/// Body of a reconciliation push.
///
/// ```json
/// {"event":"reconcile","players":[{"name":"alice","ip":"10.0.0.5"}],"timestamp":1700000000000}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilePayload {
    pub event: NotifyEvent,
    pub players: Vec<RosterEntry>,
    pub timestamp: u64,
}

impl ReconcilePayload {
    pub fn new(players: Vec<RosterEntry>, timestamp: u64) -> Self {
        Self {
            event: NotifyEvent::Reconcile,
            players,
            timestamp,
        }
    }
}

/// Response body of `GET /online`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlineReport {
    pub players: Vec<RosterEntry>,
    /// The host's public listening port.
    pub port: u16,
}

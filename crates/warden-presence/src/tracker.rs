//! Two-snapshot presence diff.
//!
//! The tracker holds what it saw on the previous tick. Each tick it is
//! handed the host's current live set and reports:
//!
//! ```text
//! previous {A, B}   current {B, C}
//!   connected    = current − previous = {C}
//!   disconnected = previous − current = {A}   (with A's last-known account)
//! ```
//!
//! The current set then replaces the held snapshot. An id appears in at
//! most one `disconnected` list across all ticks until it is seen live
//! again, so a departure is reported exactly once.

use std::collections::BTreeMap;

use warden_protocol::{AccountName, ConnectionId};

/// One live connection as observed at poll time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveConnection {
    pub id: ConnectionId,
    pub address: String,
    /// Account bound to the connection at poll time, if any.
    pub account: Option<AccountName>,
}

impl LiveConnection {
    pub fn new(id: ConnectionId, address: impl Into<String>) -> Self {
        Self {
            id,
            address: address.into(),
            account: None,
        }
    }

    pub fn with_account(mut self, account: AccountName) -> Self {
        self.account = Some(account);
        self
    }
}

/// What the tracker remembers about a connection between ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Seen {
    address: String,
    account: Option<AccountName>,
}

/// A connection present last tick and gone now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub id: ConnectionId,
    pub address: String,
    /// The account it was bound to when last seen.
    pub last_account: Option<AccountName>,
}

/// Result of one tick, both lists ordered by connection id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceDiff {
    pub connected: Vec<LiveConnection>,
    pub disconnected: Vec<Departure>,
}

impl PresenceDiff {
    pub fn is_empty(&self) -> bool {
        self.connected.is_empty() && self.disconnected.is_empty()
    }
}

/// Holds the previous snapshot and diffs against it.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    previous: BTreeMap<ConnectionId, Seen>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diffs `live` against the previous snapshot and makes it the new one.
    ///
    /// Duplicate ids in `live` collapse to the last occurrence.
    pub fn tick<I>(&mut self, live: I) -> PresenceDiff
    where
        I: IntoIterator<Item = LiveConnection>,
    {
        let current: BTreeMap<ConnectionId, Seen> = live
            .into_iter()
            .map(|c| {
                (
                    c.id,
                    Seen {
                        address: c.address,
                        account: c.account,
                    },
                )
            })
            .collect();

        let connected = current
            .iter()
            .filter(|(id, _)| !self.previous.contains_key(id))
            .map(|(id, seen)| LiveConnection {
                id: *id,
                address: seen.address.clone(),
                account: seen.account.clone(),
            })
            .collect();

        let previous = std::mem::replace(&mut self.previous, current);
        let disconnected = previous
            .into_iter()
            .filter(|(id, _)| !self.previous.contains_key(id))
            .map(|(id, seen)| Departure {
                id,
                address: seen.address,
                last_account: seen.account,
            })
            .collect();

        PresenceDiff {
            connected,
            disconnected,
        }
    }

    /// Last-known account of a connection in the held snapshot.
    pub fn last_account(&self, id: ConnectionId) -> Option<&AccountName> {
        self.previous.get(&id).and_then(|seen| seen.account.as_ref())
    }

    /// Returns `true` if `id` was live at the last tick.
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.previous.contains_key(&id)
    }

    /// Number of connections in the held snapshot.
    pub fn len(&self) -> usize {
        self.previous.len()
    }

    pub fn is_empty(&self) -> bool {
        self.previous.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn(id: u64) -> LiveConnection {
        LiveConnection::new(ConnectionId(id), format!("10.0.0.{id}"))
    }

    #[test]
    fn test_tick_first_snapshot_reports_all_connected() {
        let mut tracker = PresenceTracker::new();

        let diff = tracker.tick([conn(2), conn(1)]);

        let ids: Vec<_> = diff.connected.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![ConnectionId(1), ConnectionId(2)]);
        assert!(diff.disconnected.is_empty());
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_tick_unchanged_set_is_empty_diff() {
        let mut tracker = PresenceTracker::new();
        tracker.tick([conn(1)]);

        assert!(tracker.tick([conn(1)]).is_empty());
    }

    #[test]
    fn test_tick_departure_carries_last_account() {
        let mut tracker = PresenceTracker::new();
        tracker.tick([conn(1)]);
        tracker.tick([conn(1).with_account(AccountName::new("alice"))]);
        assert_eq!(
            tracker.last_account(ConnectionId(1)),
            Some(&AccountName::new("alice"))
        );

        let diff = tracker.tick([]);

        assert_eq!(
            diff.disconnected,
            vec![Departure {
                id: ConnectionId(1),
                address: "10.0.0.1".into(),
                last_account: Some(AccountName::new("alice")),
            }]
        );
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_tick_departure_reported_once() {
        let mut tracker = PresenceTracker::new();
        tracker.tick([conn(1), conn(2)]);

        assert_eq!(tracker.tick([conn(2)]).disconnected.len(), 1);
        assert!(tracker.tick([conn(2)]).disconnected.is_empty());
        assert!(tracker.tick([conn(2)]).is_empty());
    }

    #[test]
    fn test_tick_duplicate_ids_collapse() {
        let mut tracker = PresenceTracker::new();

        let diff = tracker.tick([conn(1), conn(1)]);

        assert_eq!(diff.connected.len(), 1);
        assert_eq!(tracker.len(), 1);
    }
}

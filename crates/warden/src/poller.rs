//! The presence poller: reconciles the session table with what the host
//! says is live, and reports every disconnect to the supervisor once.
//!
//! Each tick:
//!   1. Snapshot the host's live connections, tagging each with the
//!      account it is bound to right now.
//!   2. Diff against the previous snapshot ([`PresenceTracker`]).
//!   3. New ids: make sure the table has a session for them (covers a
//!      missed connect callback).
//!   4. Gone ids: tear down any session still open, then report
//!      `deauthorize` with the best-known account.
//!   5. Sessions the host closed *between* two polls never appear in a
//!      snapshot; their tombstones are reported here instead. A tombstone
//!      whose id the host still lists is held until the id disappears.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, trace};
use warden_presence::{LiveConnection, PollConfig, PollScheduler, PresenceDiff, PresenceTracker};
use warden_protocol::{ConnectionId, NotifyEvent};
use warden_session::Session;

use crate::AuthGateway;

/// Drives presence reconciliation for one gateway.
pub struct PresencePoller {
    gateway: Arc<AuthGateway>,
    tracker: PresenceTracker,
    /// Tombstones of sessions the host closed while still listing the
    /// connection; reported once the id leaves the snapshot.
    pending: HashMap<ConnectionId, Session>,
}

impl PresencePoller {
    pub fn new(gateway: Arc<AuthGateway>) -> Self {
        Self {
            gateway,
            tracker: PresenceTracker::new(),
            pending: HashMap::new(),
        }
    }

    /// Runs one reconciliation pass and returns the raw diff.
    pub fn poll_once(&mut self) -> PresenceDiff {
        let sessions = self.gateway.sessions();
        let notifier = self.gateway.notifier();

        let mut tombstones = std::mem::take(&mut self.pending);
        tombstones.extend(
            sessions
                .drain_departed()
                .into_iter()
                .map(|s| (s.connection_id, s)),
        );

        let live: Vec<LiveConnection> = self
            .gateway
            .host()
            .live_connections()
            .into_iter()
            .map(|(id, address)| {
                // A closed session keeps the account it had when it closed.
                let account = match (sessions.get(id), tombstones.get(&id)) {
                    (Some(session), _) => session.bound_account,
                    (None, Some(tombstone)) => tombstone.bound_account.clone(),
                    (None, None) => self.tracker.last_account(id).cloned(),
                };
                LiveConnection { id, address, account }
            })
            .collect();
        let diff = self.tracker.tick(live);

        for seen in &diff.connected {
            if tombstones.contains_key(&seen.id) {
                debug!(conn = %seen.id, "closed connection still listed by host");
            } else if sessions.open(seen.id, seen.address.as_str()) {
                info!(conn = %seen.id, address = %seen.address, "connection found by poll");
            } else {
                debug!(conn = %seen.id, address = %seen.address, "connection observed");
            }
        }

        for gone in &diff.disconnected {
            let tombstone = tombstones.remove(&gone.id);
            let account = if sessions.get(gone.id).is_some() {
                // The host never told us; tear the session down ourselves.
                let account = self.gateway.disconnect(gone.id);
                sessions.take_departed(gone.id);
                account
            } else {
                match tombstone {
                    Some(tombstone) => tombstone.bound_account,
                    None => gone.last_account.clone(),
                }
            };

            info!(
                conn = %gone.id,
                account = ?account.as_ref().map(|a| a.as_str()),
                "connection gone"
            );
            notifier.notify(
                NotifyEvent::Deauthorize,
                account.map(String::from).unwrap_or_default(),
                gone.address.as_str(),
            );
        }

        for (id, session) in tombstones {
            if self.tracker.contains(id) {
                // Reported when the host stops listing it.
                self.pending.insert(id, session);
                continue;
            }
            if let Some(account) = session.bound_account {
                info!(conn = %id, %account, "short-lived connection gone");
                notifier.notify(
                    NotifyEvent::Deauthorize,
                    account.as_str(),
                    session.remote_address,
                );
            }
        }

        diff
    }

    /// Polls on `config`'s interval until `shutdown` flips to `true`.
    pub async fn run(mut self, config: PollConfig, mut shutdown: watch::Receiver<bool>) {
        let mut scheduler = PollScheduler::new(config);
        info!(interval_ms = scheduler.interval().as_millis() as u64, "presence poller started");

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                tick = scheduler.wait_for_tick() => {
                    let diff = self.poll_once();
                    trace!(
                        tick = tick.tick,
                        connected = diff.connected.len(),
                        disconnected = diff.disconnected.len(),
                        "presence poll"
                    );
                }
            }
        }

        info!("presence poller stopped");
    }
}

//! Shared test fixtures: a recording host and a fully wired gateway.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::mpsc::UnboundedReceiver;
use warden::{AuthGateway, EventRouter, Gatekeeper, Host, Persister, Verdict};
use warden_notify::{Dispatch, Notifier};
use warden_protocol::{AccountName, Action, ConnectionId, HostEvent, Notice, NotifyEvent};
use warden_session::SessionTable;
use warden_store::{BootstrapSeed, CredentialStore, Profile};

pub const ADMIN_PASSWORD: &str = "changeme";

// =========================================================================
// RecordingHost
// =========================================================================

/// Everything the host was asked to do, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Notice(ConnectionId, Notice),
    Grant(ConnectionId),
    Revoke(ConnectionId),
    HoldAloft(ConnectionId, f64),
    ReleaseHold(ConnectionId),
    Capture(ConnectionId),
    Restore(ConnectionId, Option<Profile>),
}

#[derive(Default)]
struct HostState {
    calls: Vec<HostCall>,
    profiles: HashMap<ConnectionId, Profile>,
    names: HashMap<ConnectionId, String>,
    live: Vec<(ConnectionId, String)>,
}

/// A fake host that records calls and serves canned profiles.
#[derive(Default)]
pub struct RecordingHost {
    state: Mutex<HostState>,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<HostCall> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    pub fn notices(&self, conn: ConnectionId) -> Vec<Notice> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                HostCall::Notice(c, notice) if c == conn => Some(notice),
                _ => None,
            })
            .collect()
    }

    pub fn last_notice(&self, conn: ConnectionId) -> Option<Notice> {
        self.notices(conn).pop()
    }

    /// Index of the first call matching `pred`.
    pub fn position(&self, pred: impl Fn(&HostCall) -> bool) -> Option<usize> {
        self.calls().iter().position(pred)
    }

    pub fn is_elevated(&self, conn: ConnectionId) -> bool {
        let mut elevated = false;
        for call in self.calls() {
            match call {
                HostCall::Grant(c) if c == conn => elevated = true,
                HostCall::Revoke(c) if c == conn => elevated = false,
                _ => {}
            }
        }
        elevated
    }

    pub fn is_held(&self, conn: ConnectionId) -> bool {
        let mut held = false;
        for call in self.calls() {
            match call {
                HostCall::HoldAloft(c, _) if c == conn => held = true,
                HostCall::ReleaseHold(c) if c == conn => held = false,
                _ => {}
            }
        }
        held
    }

    /// What `capture_profile` returns for `conn` from now on.
    pub fn set_profile(&self, conn: ConnectionId, profile: Profile) {
        self.state.lock().profiles.insert(conn, profile);
    }

    /// What `player_name` returns for `conn` from now on.
    pub fn set_player_name(&self, conn: ConnectionId, name: &str) {
        self.state.lock().names.insert(conn, name.to_string());
    }

    pub fn set_live(&self, live: &[(ConnectionId, &str)]) {
        self.state.lock().live = live
            .iter()
            .map(|(id, addr)| (*id, addr.to_string()))
            .collect();
    }

    fn record(&self, call: HostCall) {
        self.state.lock().calls.push(call);
    }
}

impl Host for RecordingHost {
    fn send_notice(&self, connection: ConnectionId, notice: &Notice) {
        self.record(HostCall::Notice(connection, notice.clone()));
    }

    fn grant_elevation(&self, connection: ConnectionId) {
        self.record(HostCall::Grant(connection));
    }

    fn revoke_elevation(&self, connection: ConnectionId) {
        self.record(HostCall::Revoke(connection));
    }

    fn hold_aloft(&self, connection: ConnectionId, altitude: f64) {
        self.record(HostCall::HoldAloft(connection, altitude));
    }

    fn release_hold(&self, connection: ConnectionId) {
        self.record(HostCall::ReleaseHold(connection));
    }

    fn capture_profile(&self, connection: ConnectionId) -> Option<Profile> {
        self.record(HostCall::Capture(connection));
        self.state.lock().profiles.get(&connection).cloned()
    }

    fn restore_profile(&self, connection: ConnectionId, profile: Option<&Profile>) {
        self.record(HostCall::Restore(connection, profile.cloned()));
    }

    fn live_connections(&self) -> Vec<(ConnectionId, String)> {
        self.state.lock().live.clone()
    }

    fn port(&self) -> u16 {
        25565
    }

    fn player_name(&self, connection: ConnectionId) -> Option<String> {
        self.state.lock().names.get(&connection).cloned()
    }
}

// =========================================================================
// Fixture
// =========================================================================

pub fn cid(n: u64) -> ConnectionId {
    ConnectionId(n)
}

pub fn name(s: &str) -> AccountName {
    AccountName::new(s)
}

pub fn profile(location: &str) -> Profile {
    Profile {
        last_location: Some(location.to_string()),
        inventory: Some(format!("inv@{location}")),
        appearance: None,
    }
}

/// A gateway over an in-memory store with the superuser provisioned and a
/// detached notifier whose dispatches can be inspected.
///
/// Sync tests get a private multi-thread runtime for the persistence
/// worker; async tests reuse theirs.
pub struct Fixture {
    pub host: Arc<RecordingHost>,
    pub sessions: Arc<SessionTable>,
    pub store: Arc<CredentialStore>,
    pub gateway: Arc<AuthGateway>,
    pub router: EventRouter,
    pub dispatches: UnboundedReceiver<Dispatch>,
    runtime: Option<Runtime>,
}

pub fn fixture() -> Fixture {
    fixture_with_store(CredentialStore::in_memory())
}

pub fn fixture_with_store(store: CredentialStore) -> Fixture {
    store
        .ensure_bootstrap_account(&BootstrapSeed::default())
        .expect("bootstrap");
    let host = RecordingHost::new();
    let sessions = Arc::new(SessionTable::new());
    let store = Arc::new(store);
    let (notifier, dispatches) = Notifier::detached();
    let runtime = match Handle::try_current() {
        Ok(_) => None,
        Err(_) => Some(
            tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .expect("test runtime"),
        ),
    };
    let handle = match &runtime {
        Some(runtime) => runtime.handle().clone(),
        None => Handle::current(),
    };
    let persister = Persister::spawn(Arc::clone(&store), host.clone(), &handle);
    let gatekeeper = Gatekeeper::default();
    let gateway = Arc::new(AuthGateway::new(
        Arc::clone(&sessions),
        Arc::clone(&store),
        host.clone(),
        notifier,
        persister,
        gatekeeper.hold_altitude(),
    ));
    let router = EventRouter::new(Arc::clone(&gateway), gatekeeper);
    Fixture {
        host,
        sessions,
        store,
        gateway,
        router,
        dispatches,
        runtime,
    }
}

impl Fixture {
    pub fn dispatch(&self, conn: ConnectionId, action: Action) -> Verdict {
        self.router.dispatch(HostEvent::new(conn, action))
    }

    /// Connect + Join, like a host would report a new player.
    pub fn join(&self, conn: ConnectionId, address: &str) -> Verdict {
        self.dispatch(
            conn,
            Action::Connect {
                address: address.to_string(),
            },
        );
        self.dispatch(conn, Action::Join)
    }

    pub fn command(&self, conn: ConnectionId, line: &str) -> Verdict {
        self.dispatch(conn, Action::Command(line.to_string()))
    }

    /// Opens a session without routing, for gateway-level tests.
    pub fn open(&self, conn: ConnectionId, address: &str) {
        self.sessions.open(conn, address);
    }

    pub fn create_account(&self, user: &str, password: &str) {
        self.store.create(&name(user), password).expect("create account");
    }

    /// Waits until every queued write has finished. Sync tests only; async
    /// tests await `gateway.persister().settled()` instead.
    pub fn settle(&self) {
        self.gateway
            .persister()
            .settled()
            .blocking_recv()
            .expect("persistence worker running");
    }

    /// Everything queued on the notifier so far.
    pub fn drain_dispatches(&mut self) -> Vec<Dispatch> {
        let mut out = Vec::new();
        while let Ok(dispatch) = self.dispatches.try_recv() {
            out.push(dispatch);
        }
        out
    }

    /// `(event, player, ip)` of every queued single-event notification.
    pub fn drain_events(&mut self) -> Vec<(NotifyEvent, String, String)> {
        self.drain_dispatches()
            .into_iter()
            .filter_map(|dispatch| match dispatch {
                Dispatch::Event(p) => Some((p.event, p.player, p.ip)),
                Dispatch::Roster(_) => None,
            })
            .collect()
    }
}

//! The session table: every live connection and its account binding.
//!
//! This is the central piece of the session layer. It's responsible for:
//! - Opening sessions when the host reports a new connection
//! - Binding and unbinding accounts, enforcing one session per account
//! - Closing sessions when the host (or the presence poller) reports a
//!   disconnect
//! - Remembering recently closed sessions so the poller can still report
//!   who they were logged in as
//!
//! # Concurrency note
//!
//! Unlike a single-owner manager, the table is shared by three contexts at
//! once: the host's callback thread, the presence poller task, and the
//! status endpoint's request handlers. All state sits behind one
//! `parking_lot::RwLock`. Reads (`get`, `snapshot`, `is_bound`) take the
//! shared lock; every mutation takes the exclusive lock for a handful of
//! map operations and never performs I/O while holding it.

use std::collections::{BTreeMap, HashMap, VecDeque};

use parking_lot::RwLock;
use warden_protocol::{AccountName, ConnectionId};

use crate::{AuthState, Session, SessionError};

/// How many closed sessions are remembered before the oldest is dropped.
const DEPARTED_CAPACITY: usize = 1024;

/// All live sessions, keyed by connection.
///
/// ## Lifecycle
///
/// ```text
/// open() ──→ bind() ──→ mark_authenticated() ──→ unbind() ──→ close()
///   │                                                            │
///   ▼                                                            ▼
/// [Unauthenticated]     [Authenticated]     [Unauthenticated]  [departed]
/// ```
pub struct SessionTable {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    /// Live sessions. A `BTreeMap` so snapshots come out in a stable
    /// order without sorting.
    sessions: BTreeMap<ConnectionId, Session>,

    /// Index from bound account to the connection holding it. Kept in
    /// sync with `sessions`; this is what makes `is_bound` O(1) and the
    /// one-session-per-account check atomic.
    bindings: HashMap<AccountName, ConnectionId>,

    /// Sessions closed since the poller last looked, oldest first.
    departed: VecDeque<Session>,
}

impl SessionTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Registers a new connection as an unauthenticated session.
    ///
    /// Returns `false` if the connection was already open; in that case
    /// only the remote address is refreshed and the binding is kept.
    pub fn open(&self, connection_id: ConnectionId, address: impl Into<String>) -> bool {
        let address = address.into();
        let mut inner = self.inner.write();
        if let Some(existing) = inner.sessions.get_mut(&connection_id) {
            existing.remote_address = address;
            return false;
        }
        inner
            .sessions
            .insert(connection_id, Session::new(connection_id, address));
        tracing::info!(conn = %connection_id, "session opened");
        true
    }

    /// Removes a session and returns it as it was at the moment of closing.
    ///
    /// The closed session is also remembered (see [`take_departed`]) so
    /// its last binding can be reported after the fact.
    ///
    /// [`take_departed`]: Self::take_departed
    pub fn close(&self, connection_id: ConnectionId) -> Option<Session> {
        let mut inner = self.inner.write();
        let session = inner.sessions.remove(&connection_id)?;
        if let Some(account) = &session.bound_account {
            inner.bindings.remove(account);
        }
        if inner.departed.len() >= DEPARTED_CAPACITY {
            inner.departed.pop_front();
        }
        inner.departed.push_back(session.clone());
        tracing::info!(
            conn = %connection_id,
            account = ?session.bound_account.as_ref().map(AccountName::as_str),
            "session closed"
        );
        Some(session)
    }

    /// Looks up a session by connection.
    pub fn get(&self, connection_id: ConnectionId) -> Option<Session> {
        self.inner.read().sessions.get(&connection_id).cloned()
    }

    /// Returns the authentication state of a connection, or `None` if
    /// the connection is unknown.
    pub fn auth_state(&self, connection_id: ConnectionId) -> Option<AuthState> {
        self.inner
            .read()
            .sessions
            .get(&connection_id)
            .map(|s| s.auth_state)
    }

    /// Returns the account a connection is bound to, if any.
    pub fn bound_account(&self, connection_id: ConnectionId) -> Option<AccountName> {
        self.inner
            .read()
            .sessions
            .get(&connection_id)
            .and_then(|s| s.bound_account.clone())
    }

    /// Binds an account to a session.
    ///
    /// The check and the insert happen under one write lock, so two
    /// connections racing for the same account can't both win.
    ///
    /// Binding a session that is already bound to a *different* account
    /// switches it and resets it to `Unauthenticated`.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] — connection isn't open
    /// - [`SessionError::AlreadyBound`] — another connection holds the account
    pub fn bind(
        &self,
        connection_id: ConnectionId,
        account: AccountName,
    ) -> Result<(), SessionError> {
        let mut inner = self.inner.write();
        if !inner.sessions.contains_key(&connection_id) {
            return Err(SessionError::NotFound(connection_id));
        }
        match inner.bindings.get(&account) {
            Some(holder) if *holder == connection_id => return Ok(()),
            Some(_) => return Err(SessionError::AlreadyBound(account)),
            None => {}
        }

        let Inner {
            sessions, bindings, ..
        } = &mut *inner;
        // Checked above.
        let Some(session) = sessions.get_mut(&connection_id) else {
            return Err(SessionError::NotFound(connection_id));
        };
        if let Some(previous) = session.bound_account.take() {
            bindings.remove(&previous);
            session.auth_state = AuthState::Unauthenticated;
        }
        session.bound_account = Some(account.clone());
        bindings.insert(account, connection_id);
        Ok(())
    }

    /// Marks a bound session as authenticated.
    ///
    /// # Errors
    /// - [`SessionError::NotFound`] — connection isn't open
    /// - [`SessionError::NotBound`] — the session has no account
    pub fn mark_authenticated(&self, connection_id: ConnectionId) -> Result<(), SessionError> {
        let mut inner = self.inner.write();
        let session = inner
            .sessions
            .get_mut(&connection_id)
            .ok_or(SessionError::NotFound(connection_id))?;
        if session.bound_account.is_none() {
            return Err(SessionError::NotBound(connection_id));
        }
        session.auth_state = AuthState::Authenticated;
        Ok(())
    }

    /// Clears a session's binding and returns it to `Unauthenticated`.
    ///
    /// Returns the account that was bound, or `None` if there was none.
    ///
    /// # Errors
    /// Returns [`SessionError::NotFound`] if the connection isn't open.
    pub fn unbind(&self, connection_id: ConnectionId) -> Result<Option<AccountName>, SessionError> {
        let mut inner = self.inner.write();
        let Inner {
            sessions, bindings, ..
        } = &mut *inner;
        let session = sessions
            .get_mut(&connection_id)
            .ok_or(SessionError::NotFound(connection_id))?;
        session.auth_state = AuthState::Unauthenticated;
        let previous = session.bound_account.take();
        if let Some(account) = &previous {
            bindings.remove(account);
        }
        Ok(previous)
    }

    /// Returns `true` if any live session is bound to `account`.
    pub fn is_bound(&self, account: &AccountName) -> bool {
        self.inner.read().bindings.contains_key(account)
    }

    /// Returns the connection currently bound to `account`.
    pub fn bound_connection(&self, account: &AccountName) -> Option<ConnectionId> {
        self.inner.read().bindings.get(account).copied()
    }

    /// Returns a copy of every live session, ordered by connection id.
    pub fn snapshot(&self) -> Vec<Session> {
        self.inner.read().sessions.values().cloned().collect()
    }

    /// Removes and returns the remembered copy of a closed session.
    ///
    /// Each closed session can be taken once.
    pub fn take_departed(&self, connection_id: ConnectionId) -> Option<Session> {
        let mut inner = self.inner.write();
        let index = inner
            .departed
            .iter()
            .position(|s| s.connection_id == connection_id)?;
        inner.departed.remove(index)
    }

    /// Removes and returns every remembered closed session, oldest first.
    pub fn drain_departed(&self) -> Vec<Session> {
        self.inner.write().departed.drain(..).collect()
    }

    /// Returns the number of live sessions.
    pub fn len(&self) -> usize {
        self.inner.read().sessions.len()
    }

    /// Returns `true` if there are no live sessions.
    pub fn is_empty(&self) -> bool {
        self.inner.read().sessions.is_empty()
    }
}

impl Default for SessionTable {
    fn default() -> Self {
        Self::new()
    }
}

// =========================================================================
// Tests
// =========================================================================

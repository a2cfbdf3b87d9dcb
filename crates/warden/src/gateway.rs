//! The auth gateway: login, logout, registration and profile saving.
//!
//! The gateway is the only code that moves a session between
//! `Unauthenticated` and `Authenticated`. It coordinates four parties:
//!
//! ```text
//!                  ┌──────────────┐
//!   EventRouter ──►│ AuthGateway  │──► SessionTable     (bind / unbind)
//!   Poller      ──►│              │──► CredentialStore  (verify / profiles)
//!                  │              │──► Host             (elevation, hold, profile)
//!                  └──────────────┘──► Notifier         (logged / deauthorize)
//! ```
//!
//! Session state transitions happen synchronously. Profiles are staged in
//! the store's memory on the spot, so a relogin right after a logout sees
//! them, and the disk writes go to the [`Persister`] queue. The host's
//! callback thread never waits on the disk.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use warden_notify::Notifier;
use warden_protocol::{AccountName, ConnectionId, Notice, NotifyEvent};
use warden_session::{SessionError, SessionTable};
use warden_store::{CredentialStore, StoreError};

use crate::persist::Persister;
use crate::{AuthError, Host};

/// Authentication workflows over the shared session table and store.
pub struct AuthGateway {
    sessions: Arc<SessionTable>,
    store: Arc<CredentialStore>,
    host: Arc<dyn Host>,
    notifier: Notifier,
    persister: Persister,
    /// Held while a profile is captured and staged together with the
    /// binding change, so an autosave can't stage a profile for an
    /// account the connection no longer holds.
    profiles: Mutex<()>,
    hold_altitude: f64,
}

impl AuthGateway {
    pub fn new(
        sessions: Arc<SessionTable>,
        store: Arc<CredentialStore>,
        host: Arc<dyn Host>,
        notifier: Notifier,
        persister: Persister,
        hold_altitude: f64,
    ) -> Self {
        Self {
            sessions,
            store,
            host,
            notifier,
            persister,
            profiles: Mutex::new(()),
            hold_altitude,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionTable> {
        &self.sessions
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn persister(&self) -> &Persister {
        &self.persister
    }

    // -----------------------------------------------------------------------
    // Login / logout
    // -----------------------------------------------------------------------

    /// Logs a connection in.
    ///
    /// 1. Refuses if another connection holds the account.
    /// 2. If the connection is logged in as a different account, logs it
    ///    out of that one first (elevation revoked, profile saved).
    /// 3. Checks the password.
    /// 4. Binds, restores the account's profile, releases the hold, grants
    ///    elevation to the superuser and reports `logged`.
    ///
    /// # Errors
    /// - [`AuthError::AlreadyLoggedIn`] — another connection has the account,
    ///   or this connection is already logged in as it
    /// - [`AuthError::InvalidCredentials`] — unknown account or wrong password
    /// - [`AuthError::Session`] — the connection isn't open
    pub fn login(
        &self,
        connection: ConnectionId,
        account: &AccountName,
        password: &str,
    ) -> Result<AccountName, AuthError> {
        let session = self
            .sessions
            .get(connection)
            .ok_or(SessionError::NotFound(connection))?;

        if self.sessions.is_bound(account) {
            debug!(conn = %connection, %account, "login refused, account in use");
            return Err(AuthError::AlreadyLoggedIn(account.clone()));
        }

        if let Some(previous) = session.bound_account.as_ref() {
            if let Some(previous) = self.release(connection)? {
                self.host
                    .send_notice(connection, &Notice::LoggedOutFrom(previous.clone()));
                self.host.hold_aloft(connection, self.hold_altitude);
                self.notifier.notify(
                    NotifyEvent::Deauthorize,
                    previous.as_str(),
                    session.remote_address.as_str(),
                );
                info!(conn = %connection, account = %previous, "switched away from account");
            } else {
                debug!(conn = %connection, account = %previous, "binding vanished before switch");
            }
        }

        if !self.store.verify(account, password) {
            debug!(conn = %connection, %account, "invalid credentials");
            return Err(AuthError::InvalidCredentials);
        }

        self.sessions
            .bind(connection, account.clone())
            .map_err(|e| match e {
                SessionError::AlreadyBound(name) => AuthError::AlreadyLoggedIn(name),
                other => AuthError::Session(other),
            })?;
        self.sessions.mark_authenticated(connection)?;

        let profile = self.store.load_profile(account);
        self.host.restore_profile(connection, profile.as_ref());
        self.host.release_hold(connection);

        if account.is_superuser() {
            self.host.grant_elevation(connection);
            self.host.send_notice(connection, &Notice::ElevationGranted);
            info!(conn = %connection, "elevation granted");
        }

        self.notifier.notify(
            NotifyEvent::Logged,
            account.as_str(),
            session.remote_address.as_str(),
        );
        info!(conn = %connection, %account, "logged in");
        Ok(account.clone())
    }

    /// Logs a connection out and puts it back on hold.
    ///
    /// # Errors
    /// - [`AuthError::NotLoggedIn`] — no account bound
    /// - [`AuthError::Session`] — the connection isn't open
    pub fn logout(&self, connection: ConnectionId) -> Result<AccountName, AuthError> {
        let address = self
            .sessions
            .get(connection)
            .ok_or(SessionError::NotFound(connection))?
            .remote_address;
        let account = self.release(connection)?.ok_or(AuthError::NotLoggedIn)?;

        self.host.hold_aloft(connection, self.hold_altitude);
        self.notifier
            .notify(NotifyEvent::Deauthorize, account.as_str(), address);
        info!(conn = %connection, %account, "logged out");
        Ok(account)
    }

    /// Tears down a connection that has left: revokes elevation, saves the
    /// profile and closes the session.
    ///
    /// Returns the account the connection was bound to. Does not notify;
    /// the presence poller reports disconnects. Unknown connections are a
    /// no-op returning `None`.
    pub fn disconnect(&self, connection: ConnectionId) -> Option<AccountName> {
        let account = {
            let _profiles = self.profiles.lock();
            let account = self.sessions.bound_account(connection);
            if let Some(account) = &account {
                self.revoke_if_superuser(connection, account);
                self.stage_profile(connection, account);
            }
            self.sessions.close(connection);
            account
        };
        if account.is_some() {
            self.persister.flush();
        }
        account
    }

    /// Revokes elevation, stages the profile and unbinds. Returns the
    /// account that was bound.
    fn release(&self, connection: ConnectionId) -> Result<Option<AccountName>, AuthError> {
        let released = {
            let _profiles = self.profiles.lock();
            let Some(account) = self.sessions.bound_account(connection) else {
                return Ok(None);
            };
            self.revoke_if_superuser(connection, &account);
            self.stage_profile(connection, &account);
            self.sessions.unbind(connection)?
        };
        self.persister.flush();
        Ok(released)
    }

    fn revoke_if_superuser(&self, connection: ConnectionId, account: &AccountName) {
        if account.is_superuser() {
            self.host.revoke_elevation(connection);
            self.host.send_notice(connection, &Notice::ElevationRevoked);
            info!(conn = %connection, "elevation revoked");
        }
    }

    // -----------------------------------------------------------------------
    // Registration
    // -----------------------------------------------------------------------

    /// Returns `true` if `caller` may create accounts: it must be logged
    /// in as the superuser.
    pub fn registration_open(&self, caller: ConnectionId) -> bool {
        self.sessions
            .get(caller)
            .is_some_and(|s| s.is_authenticated() && s.is_superuser())
    }

    /// Creates an account on behalf of `caller`. Does not log anyone in.
    ///
    /// The checks that need no disk run here; the write itself is queued
    /// on the [`Persister`], which sends `caller` the `AccountCreated` or
    /// failure notice when it finishes.
    ///
    /// # Errors
    /// - [`AuthError::RegistrationClosed`] — caller isn't the superuser
    /// - [`AuthError::AlreadyExists`] — name taken
    /// - [`AuthError::Store`] — empty name
    pub fn register(
        &self,
        caller: ConnectionId,
        account: &AccountName,
        password: &str,
    ) -> Result<(), AuthError> {
        if !self.registration_open(caller) {
            debug!(conn = %caller, %account, "registration refused");
            return Err(AuthError::RegistrationClosed);
        }
        if account.is_empty() {
            return Err(StoreError::InvalidName.into());
        }
        if self.store.exists(account) {
            return Err(AuthError::AlreadyExists(account.clone()));
        }
        debug!(conn = %caller, %account, "registration queued");
        self.persister
            .register(caller, account.clone(), password.to_owned());
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Profiles
    // -----------------------------------------------------------------------

    /// Saves the connection's current profile under its bound account, if
    /// it has one. The write runs in the background.
    pub fn save_profile(&self, connection: ConnectionId) {
        let staged = {
            let _profiles = self.profiles.lock();
            match self.sessions.bound_account(connection) {
                Some(account) => self.stage_profile(connection, &account),
                None => false,
            }
        };
        if staged {
            self.persister.flush();
        }
    }

    /// Stages every authenticated session's profile and queues one save.
    /// Returns how many profiles were staged.
    pub fn save_all(&self) -> usize {
        let mut staged = 0;
        for session in self.sessions.snapshot() {
            if !session.is_authenticated() {
                continue;
            }
            let Some(account) = session.bound_account else {
                continue;
            };
            let _profiles = self.profiles.lock();
            // Logged out or switched since the snapshot.
            if self.sessions.bound_account(session.connection_id).as_ref() != Some(&account) {
                continue;
            }
            if self.stage_profile(session.connection_id, &account) {
                staged += 1;
            }
        }
        // A dirty store retries a flush that failed earlier.
        if staged > 0 || self.store.is_dirty() {
            self.persister.flush();
        }
        debug!(staged, "staged all profiles");
        staged
    }

    /// Captures the connection's profile into the store's memory. Call
    /// with `profiles` held.
    fn stage_profile(&self, connection: ConnectionId, account: &AccountName) -> bool {
        let Some(profile) = self.host.capture_profile(connection) else {
            return false;
        };
        match self.store.stage_profile(account, profile) {
            Ok(()) => true,
            Err(e) => {
                warn!(%account, error = %e, "failed to stage profile");
                false
            }
        }
    }
}

//! Event routing: one entry point for every host notification.
//!
//! The host adapter calls [`EventRouter::dispatch`] for each callback and
//! acts on the returned [`Verdict`]. The flow is:
//!   1. Connect / Quit → open or tear down the session
//!   2. Everything else → ask the [`Gatekeeper`] given the session's state
//!   3. Allowed `login` / `register` / `logout` → run it here, `Handled`
//!   4. Denials with a notice → show the notice

use std::sync::Arc;

use tracing::debug;
use warden_protocol::{AccountName, Action, ConnectionId, HostEvent, Notice, NotifyEvent};
use warden_session::AuthState;

use crate::gatekeeper::command_name;
use crate::{AuthGateway, Gatekeeper, Verdict};

/// Commands Warden runs itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WardenCommand {
    Login,
    Register,
    Logout,
}

impl WardenCommand {
    fn parse(name: &str) -> Option<Self> {
        if name.eq_ignore_ascii_case("login") {
            Some(Self::Login)
        } else if name.eq_ignore_ascii_case("register") {
            Some(Self::Register)
        } else if name.eq_ignore_ascii_case("logout") {
            Some(Self::Logout)
        } else {
            None
        }
    }
}

/// Routes host events through the gatekeeper and the auth gateway.
pub struct EventRouter {
    gateway: Arc<AuthGateway>,
    gatekeeper: Gatekeeper,
}

impl EventRouter {
    pub fn new(gateway: Arc<AuthGateway>, gatekeeper: Gatekeeper) -> Self {
        Self {
            gateway,
            gatekeeper,
        }
    }

    pub fn gateway(&self) -> &Arc<AuthGateway> {
        &self.gateway
    }

    pub fn gatekeeper(&self) -> &Gatekeeper {
        &self.gatekeeper
    }

    /// Handles one host event and tells the host what to do with it.
    ///
    /// Never blocks on I/O and never fails: user mistakes become notices,
    /// internal failures are logged.
    pub fn dispatch(&self, event: HostEvent) -> Verdict {
        let HostEvent { connection, action } = event;
        let sessions = self.gateway.sessions();

        match &action {
            Action::Connect { address } => {
                sessions.open(connection, address.as_str());
                return Verdict::Allow;
            }
            Action::Quit => {
                self.gateway.disconnect(connection);
                return Verdict::Allow;
            }
            Action::Join => {
                let address = match sessions.get(connection) {
                    Some(session) => session.remote_address,
                    None => {
                        sessions.open(connection, "");
                        String::new()
                    }
                };
                let player = self
                    .gateway
                    .host()
                    .player_name(connection)
                    .unwrap_or_default();
                self.gateway
                    .notifier()
                    .notify(NotifyEvent::Connected, player, address);
            }
            _ => {}
        }

        let auth = sessions.auth_state(connection).unwrap_or_default();
        let verdict = self.gatekeeper.evaluate(auth, &action);
        debug!(conn = %connection, action = action.kind(), ?verdict, "gatekeeper");

        match (&verdict, &action) {
            (Verdict::HoldAloft, _) => {
                let host = self.gateway.host();
                host.send_notice(connection, &Notice::LoginPrompt);
                host.hold_aloft(connection, self.gatekeeper.hold_altitude());
                verdict
            }
            (Verdict::Deny(Some(notice)), _) => {
                self.gateway.host().send_notice(connection, notice);
                verdict
            }
            (Verdict::Allow, Action::Command(line)) => self.run_command(connection, auth, line),
            _ => verdict,
        }
    }

    /// Runs `login` / `register` / `logout`; any other command is the
    /// host's business.
    fn run_command(&self, connection: ConnectionId, auth: AuthState, line: &str) -> Verdict {
        let Some(command) = command_name(line).and_then(WardenCommand::parse) else {
            return Verdict::Allow;
        };
        let args: Vec<&str> = line.split_whitespace().skip(1).collect();

        let notice = match command {
            WardenCommand::Login => Some(self.login(connection, &args)),
            WardenCommand::Register => self.register(connection, &args),
            WardenCommand::Logout if auth.is_authenticated() => {
                match self.gateway.logout(connection) {
                    Ok(_) => Some(Notice::LoggedOut),
                    Err(e) => Some(e.notice()),
                }
            }
            WardenCommand::Logout => Some(Notice::NotLoggedIn),
        };
        if let Some(notice) = notice {
            self.gateway.host().send_notice(connection, &notice);
        }
        Verdict::Handled
    }

    fn login(&self, connection: ConnectionId, args: &[&str]) -> Notice {
        let [user, password] = args else {
            return Notice::LoginUsage;
        };
        match self
            .gateway
            .login(connection, &AccountName::new(user), password)
        {
            Ok(account) => Notice::LoggedIn(account),
            Err(e) => {
                debug!(conn = %connection, error = %e, "login failed");
                e.notice()
            }
        }
    }

    /// `None` once the creation is queued; the persistence worker sends
    /// the outcome.
    fn register(&self, connection: ConnectionId, args: &[&str]) -> Option<Notice> {
        if !self.gateway.registration_open(connection) {
            return Some(Notice::RegistrationClosed);
        }
        let [user, password] = args else {
            return Some(Notice::RegisterUsage);
        };
        match self
            .gateway
            .register(connection, &AccountName::new(user), password)
        {
            Ok(()) => None,
            Err(e) => {
                debug!(conn = %connection, error = %e, "registration failed");
                Some(e.notice())
            }
        }
    }
}

//! The gatekeeper: what an unauthenticated session may do.
//!
//! A pure function of `(auth state, action)`. It holds no state and does
//! no I/O; the [`EventRouter`](crate::EventRouter) carries out whatever it
//! decides.
//!
//! | Action       | Unauthenticated                                   |
//! |--------------|---------------------------------------------------|
//! | Join         | `HoldAloft` (prompt + holding state)              |
//! | Move         | horizontal pinned, vertical floored at altitude   |
//! | DropItem     | `Deny`                                            |
//! | Damage       | `Deny`                                            |
//! | Command      | only `login` / `register`, else "login first"     |
//! | Connect/Quit | `Allow`                                           |
//! | Chat         | `Allow`                                           |
//!
//! Once authenticated, everything is allowed.

use warden_protocol::{Action, Notice, Position};
use warden_session::AuthState;

/// Commands an unauthenticated session may run.
pub const ALLOWED_COMMANDS: [&str; 2] = ["login", "register"];

/// Default holding altitude.
pub const DEFAULT_HOLD_ALTITUDE: f64 = 300.0;

/// Outcome of routing one host event.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Let the host carry on.
    Allow,
    /// Cancel the action; show the notice if there is one.
    Deny(Option<Notice>),
    /// Cancel the move and put the connection here instead.
    Redirect(Position),
    /// The connection just joined unauthenticated and was put on hold.
    HoldAloft,
    /// Warden consumed the event (one of its own commands); the host
    /// must not process it further.
    Handled,
}

impl Verdict {
    /// Returns `true` if the host should cancel its own processing.
    pub fn cancels(&self) -> bool {
        !matches!(self, Self::Allow | Self::HoldAloft)
    }
}

/// Decides what sessions may do before they log in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gatekeeper {
    hold_altitude: f64,
}

impl Default for Gatekeeper {
    fn default() -> Self {
        Self::new(DEFAULT_HOLD_ALTITUDE)
    }
}

impl Gatekeeper {
    pub fn new(hold_altitude: f64) -> Self {
        Self { hold_altitude }
    }

    /// The altitude used both when placing a joining session and when
    /// flooring its moves.
    pub fn hold_altitude(&self) -> f64 {
        self.hold_altitude
    }

    pub fn evaluate(&self, auth: AuthState, action: &Action) -> Verdict {
        if auth.is_authenticated() {
            return Verdict::Allow;
        }

        match action {
            Action::Join => Verdict::HoldAloft,
            Action::Move { from, to } => self.check_move(from, to),
            Action::DropItem | Action::Damage => Verdict::Deny(None),
            Action::Command(line) => match command_name(line) {
                Some(name) if is_allowed_command(name) => Verdict::Allow,
                _ => Verdict::Deny(Some(Notice::AuthenticateFirst)),
            },
            Action::Connect { .. } | Action::Quit | Action::Chat(_) => Verdict::Allow,
        }
    }

    fn check_move(&self, from: &Position, to: &Position) -> Verdict {
        if !from.moved_horizontally_to(to) && to.y >= self.hold_altitude {
            return Verdict::Allow;
        }
        Verdict::Redirect(Position::new(from.x, to.y.max(self.hold_altitude), from.z))
    }
}

/// Extracts the command name from a raw command line: first word, leading
/// `/` stripped. `None` for a blank line.
pub fn command_name(line: &str) -> Option<&str> {
    let first = line.split_whitespace().next()?;
    let name = first.strip_prefix('/').unwrap_or(first);
    (!name.is_empty()).then_some(name)
}

fn is_allowed_command(name: &str) -> bool {
    ALLOWED_COMMANDS
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(name))
}

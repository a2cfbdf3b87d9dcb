//! Session types: the server's record of one live connection.
//!
//! A session tracks:
//! - WHICH connection it is (`ConnectionId`)
//! - WHERE it connected from (remote address, possibly empty)
//! - WHO it claims to be (bound account, if any)
//! - WHETHER that claim has been verified (`AuthState`)

use warden_protocol::{AccountName, ConnectionId};

// ---------------------------------------------------------------------------
// AuthState
// ---------------------------------------------------------------------------

/// Whether a session has presented valid credentials.
///
/// ```text
///   Unauthenticated ──(login)──→ Authenticated
///          ↑                          │
///          └────────(logout)──────────┘
/// ```
///
/// Every session starts `Unauthenticated`. `Authenticated` implies the
/// session is bound to an account; the table refuses to mark an unbound
/// session as authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    Authenticated,
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One live connection's authentication state.
///
/// Owned by the [`SessionTable`](crate::SessionTable). Everything outside
/// the table works with clones handed out by `get` and `snapshot`, never
/// with references into the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// The host's identifier for this connection.
    pub connection_id: ConnectionId,

    /// Remote address as reported by the host. Empty if unavailable.
    pub remote_address: String,

    /// The account this connection is logged in as.
    ///
    /// At most one live session may be bound to a given account name.
    pub bound_account: Option<AccountName>,

    /// Current authentication state.
    pub auth_state: AuthState,
}

impl Session {
    /// Creates a fresh, unauthenticated, unbound session.
    pub fn new(connection_id: ConnectionId, remote_address: impl Into<String>) -> Self {
        Self {
            connection_id,
            remote_address: remote_address.into(),
            bound_account: None,
            auth_state: AuthState::Unauthenticated,
        }
    }

    /// Returns `true` if this session has presented valid credentials.
    pub fn is_authenticated(&self) -> bool {
        self.auth_state.is_authenticated()
    }

    /// Returns `true` if this session is bound to the well-known superuser.
    pub fn is_superuser(&self) -> bool {
        self.bound_account
            .as_ref()
            .is_some_and(AccountName::is_superuser)
    }
}

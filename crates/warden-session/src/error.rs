//! Error types for the session layer.

use warden_protocol::{AccountName, ConnectionId};

/// Errors that can occur while mutating the session table.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No live session exists for the given connection.
    /// This happens when the host reports an action for a connection it
    /// never opened, or one that was already closed.
    #[error("session not found for {0}")]
    NotFound(ConnectionId),

    /// Another live session is already bound to this account.
    /// An account can be logged in from one connection at a time.
    #[error("account {0} is already bound to another session")]
    AlreadyBound(AccountName),

    /// The session has no bound account, so it can't be authenticated.
    #[error("{0} is not bound to an account")]
    NotBound(ConnectionId),
}

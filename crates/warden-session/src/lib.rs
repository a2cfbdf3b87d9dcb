//! Live session tracking for Warden.
//!
//! This crate answers one question for the rest of the gateway: *what is
//! the authentication state of this connection right now?*
//!
//! 1. **Sessions** — one record per live connection ([`Session`]), with an
//!    [`AuthState`] that starts `Unauthenticated`
//! 2. **The table** — the shared registry of sessions ([`SessionTable`]),
//!    which enforces that an account is bound to at most one session
//!
//! # How it fits in the stack
//!
//! ```text
//! Gatekeeper / AuthGateway / PresencePoller / StatusEndpoint (above)
//!     ↕
//! Session Layer (this crate)  ← connection identity and auth state
//!     ↕
//! Protocol Layer (below)  ← provides ConnectionId, AccountName
//! ```

mod error;
mod session;
mod table;

pub use error::SessionError;
pub use session::{AuthState, Session};
pub use table::SessionTable;

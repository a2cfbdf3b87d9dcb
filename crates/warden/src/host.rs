//! The session host seam.
//!
//! Warden doesn't own connections; the host (a game server, a terminal
//! multiplexer, anything with interactive sessions) does. The host adapter
//! turns its callbacks into [`HostEvent`](warden_protocol::HostEvent)s for
//! the [`EventRouter`](crate::EventRouter) and implements [`Host`] so
//! Warden can act back on connections.

use warden_protocol::{ConnectionId, Notice};
use warden_store::Profile;

/// Operations Warden performs on the session host.
///
/// # Contract
///
/// Every method is called from the host's own callback context as well as
/// from background tasks, so implementations must be cheap, must not block
/// and must tolerate connections that have already gone away (treat them
/// as no-ops).
pub trait Host: Send + Sync + 'static {
    /// Shows a short message to one connection.
    fn send_notice(&self, connection: ConnectionId, notice: &Notice);

    /// Gives the connection administrative powers.
    fn grant_elevation(&self, connection: ConnectionId);

    /// Takes administrative powers away again.
    fn revoke_elevation(&self, connection: ConnectionId);

    /// Puts the connection in the holding state: suspended at `altitude`
    /// above its current spot, free to fly but not to walk away.
    fn hold_aloft(&self, connection: ConnectionId, altitude: f64);

    /// Ends the holding state (flight off).
    fn release_hold(&self, connection: ConnectionId);

    /// Snapshots the connection's profile (location, inventory,
    /// appearance). `None` when there's nothing to capture.
    fn capture_profile(&self, connection: ConnectionId) -> Option<Profile>;

    /// Applies a stored profile. With `None` or a profile without a
    /// location, the connection goes to the default spawn point.
    fn restore_profile(&self, connection: ConnectionId, profile: Option<&Profile>);

    /// Every connection the host considers live right now, with its
    /// remote address.
    fn live_connections(&self) -> Vec<(ConnectionId, String)>;

    /// The host's public listening port, as reported by the status endpoint.
    fn port(&self) -> u16;

    /// The name the connection presented to the host, before any login.
    /// Reported as the player of the `connected` event; hosts without
    /// such a name leave the field empty.
    fn player_name(&self, _connection: ConnectionId) -> Option<String> {
        None
    }
}

//! Read-only status endpoint: `GET /online`.
//!
//! ```json
//! {"players":[{"name":"alice","ip":"10.0.0.5"},{"name":"Not-Logged","ip":"10.0.0.6"}],"port":25565}
//! ```
//!
//! The endpoint doesn't authenticate callers. Bind it to loopback or an
//! internal interface only.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use warden_protocol::{NOT_LOGGED_IN, OnlineReport, RosterEntry};
use warden_session::SessionTable;

use crate::Host;

/// Name/address pairs for every live session, ordered by connection.
/// Sessions that aren't authenticated are reported as [`NOT_LOGGED_IN`].
pub fn roster(sessions: &SessionTable) -> Vec<RosterEntry> {
    sessions
        .snapshot()
        .into_iter()
        .map(|session| {
            let name = match (&session.bound_account, session.is_authenticated()) {
                (Some(account), true) => account.to_string(),
                _ => NOT_LOGGED_IN.to_string(),
            };
            RosterEntry {
                name,
                ip: session.remote_address,
            }
        })
        .collect()
}

#[derive(Clone)]
struct StatusState {
    sessions: Arc<SessionTable>,
    host: Arc<dyn Host>,
}

/// `GET /online`
async fn handle_online(State(state): State<StatusState>) -> Json<OnlineReport> {
    Json(OnlineReport {
        players: roster(&state.sessions),
        port: state.host.port(),
    })
}

/// The endpoint's routes, without a listener.
pub fn router(sessions: Arc<SessionTable>, host: Arc<dyn Host>) -> Router {
    Router::new()
        .route("/online", get(handle_online))
        .with_state(StatusState { sessions, host })
}

/// A bound, not yet serving, status endpoint.
pub struct StatusEndpoint {
    listener: TcpListener,
    app: Router,
}

impl StatusEndpoint {
    /// Binds the listener. Use port 0 to let the OS pick one.
    pub async fn bind(
        addr: &str,
        sessions: Arc<SessionTable>,
        host: Arc<dyn Host>,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "status endpoint listening");
        Ok(Self {
            listener,
            app: router(sessions, host),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serves requests until `shutdown` resolves.
    pub async fn serve<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await
    }
}

//! # Warden
//!
//! Authentication gateway for interactive multi-user session hosts.
//!
//! Every connection starts out restricted: it can't walk away, drop
//! items, take damage or run commands other than `login` and `register`
//! until it logs in. Warden keeps the session table, verifies credentials
//! against a salted-hash account store, tells an external supervisor who
//! logged in and who left, and answers `GET /online` for tooling.
//!
//! The host implements [`Host`] and feeds its callbacks to
//! [`EventRouter::dispatch`]; Warden does the rest.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use warden::prelude::*;
//!
//! // Implement Host for your server, then:
//! // warden::init_logging("info");
//! // let warden = Warden::builder()
//! //     .config(WardenConfig::load("warden.toml")?)
//! //     .build(Arc::new(MyHost::new()))
//! //     .await?;
//! // let router = warden.router();
//! // warden.run(shutdown_signal).await
//! ```

mod config;
mod error;
mod gatekeeper;
mod gateway;
mod handler;
mod host;
mod persist;
mod poller;
mod server;
pub mod status;

pub use config::{
    GatekeeperSection, NotifySection, PresenceSection, StatusSection, StoreSection, WardenConfig,
};
pub use error::{AuthError, ConfigError, WardenError};
pub use gatekeeper::{ALLOWED_COMMANDS, DEFAULT_HOLD_ALTITUDE, Gatekeeper, Verdict, command_name};
pub use gateway::AuthGateway;
pub use handler::EventRouter;
pub use host::Host;
pub use persist::Persister;
pub use poller::PresencePoller;
pub use server::{Warden, WardenBuilder};
pub use status::StatusEndpoint;

/// Installs a global `tracing` subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set. Calling this twice is
/// harmless; the second call is ignored.
pub fn init_logging(default_filter: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Common imports for host adapters.
pub mod prelude {
    pub use std::sync::Arc;

    pub use warden_notify::{Notifier, NotifyConfig};
    pub use warden_protocol::{AccountName, Action, ConnectionId, HostEvent, Notice, Position};
    pub use warden_session::{AuthState, SessionTable};
    pub use warden_store::{CredentialStore, JsonFileStore, MemoryStore, Profile};

    pub use crate::{
        AuthError, AuthGateway, EventRouter, Gatekeeper, Host, Verdict, Warden, WardenConfig,
        WardenError,
    };
}

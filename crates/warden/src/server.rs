//! `Warden` builder and runtime.
//!
//! This is the entry point for running Warden inside a host. It ties
//! together all the layers: store → sessions → gateway → router, plus the
//! background presence poller, autosave loop and status endpoint.
//!
//! ```text
//!               ┌───────────────────────── Warden ─────────────────────────┐
//! host ──event──► EventRouter ──► AuthGateway ──► SessionTable / Store     │
//!               │                      │                                   │
//!               │ PresencePoller ──────┤ (every poll_interval)             │
//!               │ autosave ────────────┘ (every autosave_interval)         │
//!               │ StatusEndpoint ──► GET /online                           │
//!               └───────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use warden_notify::Notifier;
use warden_session::SessionTable;
use warden_store::{CredentialStore, JsonFileStore};

use crate::status::{StatusEndpoint, roster};
use crate::{
    AuthGateway, EventRouter, Gatekeeper, Host, Persister, PresencePoller, WardenConfig,
    WardenError,
};

/// Builder for configuring and starting Warden.
///
/// # Example
///
/// ```rust,ignore
/// use warden::prelude::*;
///
/// let warden = Warden::builder()
///     .config(WardenConfig::load("warden.toml")?)
///     .build(Arc::new(MyHost::new()))
///     .await?;
/// let router = warden.router();        // hand to the host adapter
/// warden.run(tokio::signal::ctrl_c().map(|_| ())).await
/// ```
pub struct WardenBuilder {
    config: WardenConfig,
    store: Option<CredentialStore>,
    notifier: Option<Notifier>,
}

impl WardenBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: WardenConfig::default(),
            store: None,
            notifier: None,
        }
    }

    pub fn config(mut self, config: WardenConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses this store instead of opening `config.store.path`.
    pub fn store(mut self, store: CredentialStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Uses this notifier instead of spawning one from `config.notify`.
    pub fn notifier(mut self, notifier: Notifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Opens the store, provisions the superuser, starts the notifier and
    /// binds the status endpoint. Nothing runs until [`Warden::run`].
    pub async fn build(self, host: Arc<dyn Host>) -> Result<Warden, WardenError> {
        let config = self.config.validated();

        let store = match self.store {
            Some(store) => store,
            None => CredentialStore::open(JsonFileStore::new(&config.store.path))?,
        };
        store.ensure_bootstrap_account(&config.bootstrap)?;

        let notifier = match self.notifier {
            Some(notifier) => notifier,
            None => Notifier::spawn(config.notify.to_notify_config())?,
        };

        let store = Arc::new(store);
        let persister = Persister::spawn(
            Arc::clone(&store),
            Arc::clone(&host),
            &tokio::runtime::Handle::current(),
        );

        let sessions = Arc::new(SessionTable::new());
        let gatekeeper = Gatekeeper::new(config.gatekeeper.hold_altitude);
        let gateway = Arc::new(AuthGateway::new(
            Arc::clone(&sessions),
            store,
            Arc::clone(&host),
            notifier,
            persister,
            gatekeeper.hold_altitude(),
        ));
        let router = Arc::new(EventRouter::new(Arc::clone(&gateway), gatekeeper));

        let status = StatusEndpoint::bind(&config.status.address(), sessions, host).await?;

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Warden {
            config,
            gateway,
            router,
            status,
            shutdown_tx,
        })
    }
}

impl Default for WardenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A built Warden instance.
///
/// Call [`run()`](Self::run) to start the background loops.
pub struct Warden {
    config: WardenConfig,
    gateway: Arc<AuthGateway>,
    router: Arc<EventRouter>,
    status: StatusEndpoint,
    shutdown_tx: watch::Sender<bool>,
}

impl Warden {
    /// Creates a new builder.
    pub fn builder() -> WardenBuilder {
        WardenBuilder::new()
    }

    /// The router the host adapter feeds events into.
    pub fn router(&self) -> Arc<EventRouter> {
        Arc::clone(&self.router)
    }

    pub fn gateway(&self) -> Arc<AuthGateway> {
        Arc::clone(&self.gateway)
    }

    pub fn config(&self) -> &WardenConfig {
        &self.config
    }

    /// Returns the address the status endpoint is bound to.
    pub fn status_addr(&self) -> std::io::Result<SocketAddr> {
        self.status.local_addr()
    }

    /// Queues a reconciliation push of everyone online.
    pub fn push_roster(&self) {
        self.gateway
            .notifier()
            .push_roster(roster(self.gateway.sessions()));
    }

    /// Runs the poller, autosave loop and status endpoint until `shutdown`
    /// resolves, then saves every authenticated profile and waits for the
    /// queued writes to finish.
    ///
    /// A reconciliation push goes out once at startup.
    pub async fn run<F>(self, shutdown: F) -> Result<(), WardenError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        tracing::info!("warden running");
        self.push_roster();

        let poller = tokio::spawn(
            PresencePoller::new(Arc::clone(&self.gateway))
                .run(self.config.presence.to_poll_config(), self.shutdown_tx.subscribe()),
        );
        let autosave = tokio::spawn(autosave_loop(
            Arc::clone(&self.gateway),
            self.config.autosave_interval(),
            self.shutdown_tx.subscribe(),
        ));

        let mut status_shutdown = self.shutdown_tx.subscribe();
        let served = self
            .status
            .serve(async move {
                let _ = status_shutdown.wait_for(|stop| *stop).await;
            });

        let shutdown_tx = self.shutdown_tx.clone();
        tokio::spawn(async move {
            shutdown.await;
            tracing::info!("warden shutting down");
            let _ = shutdown_tx.send(true);
        });

        let result = served.await;
        // The endpoint can also stop on its own error; stop the loops too.
        let _ = self.shutdown_tx.send(true);
        let _ = poller.await;
        let _ = autosave.await;

        let saved = self.gateway.save_all();
        match self.gateway.persister().settled().await {
            Ok(()) => tracing::info!(saved, "profiles saved at shutdown"),
            Err(_) => tracing::warn!("final profile save did not complete"),
        }

        result?;
        tracing::info!("warden stopped");
        Ok(())
    }
}

async fn autosave_loop(
    gateway: Arc<AuthGateway>,
    every: std::time::Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                let saved = gateway.save_all();
                tracing::debug!(saved, "autosave");
            }
        }
    }
}

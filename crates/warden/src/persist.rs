//! The persistence worker: every durable write, in order, off the caller's thread.
//!
//! ```text
//! gateway ──flush()/register()──► mpsc ──► PersistWorker ──spawn_blocking──► CredentialStore
//!   (never waits)                          (one task, one job at a time)
//! ```
//!
//! Profiles are staged in the store's memory by the gateway before a
//! `Flush` is queued, so readers never see a stale profile while the write
//! is pending. Jobs run strictly one after another; a flush always writes
//! whatever memory holds when it starts.

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use warden_protocol::{AccountName, ConnectionId, Notice};
use warden_store::CredentialStore;

use crate::{AuthError, Host};

enum PersistJob {
    Flush,
    Register {
        caller: ConnectionId,
        account: AccountName,
        password: String,
    },
    Settled(oneshot::Sender<()>),
}

/// Handle for queuing durable writes. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Persister {
    sender: mpsc::UnboundedSender<PersistJob>,
}

impl Persister {
    /// Starts the worker on `runtime`. Works from any thread, inside a
    /// runtime or not.
    pub fn spawn(store: Arc<CredentialStore>, host: Arc<dyn Host>, runtime: &Handle) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = PersistWorker {
            store,
            host,
            receiver,
        };
        runtime.spawn(worker.run());
        Self { sender }
    }

    /// Queues a save of everything staged so far.
    pub fn flush(&self) {
        self.enqueue(PersistJob::Flush);
    }

    /// Queues an account creation. `caller` gets `AccountCreated` or the
    /// failure notice once the write is done.
    pub fn register(&self, caller: ConnectionId, account: AccountName, password: String) {
        self.enqueue(PersistJob::Register {
            caller,
            account,
            password,
        });
    }

    /// Resolves once every job queued before this call has finished.
    ///
    /// The receiver errors if the worker is gone.
    pub fn settled(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.enqueue(PersistJob::Settled(tx));
        rx
    }

    fn enqueue(&self, job: PersistJob) {
        if self.sender.send(job).is_err() {
            warn!("persistence worker stopped, dropping write");
        }
    }
}

struct PersistWorker {
    store: Arc<CredentialStore>,
    host: Arc<dyn Host>,
    receiver: mpsc::UnboundedReceiver<PersistJob>,
}

impl PersistWorker {
    async fn run(mut self) {
        debug!("persistence worker started");

        while let Some(job) = self.receiver.recv().await {
            match job {
                PersistJob::Flush => self.flush().await,
                PersistJob::Register {
                    caller,
                    account,
                    password,
                } => self.register(caller, account, password).await,
                PersistJob::Settled(done) => {
                    let _ = done.send(());
                }
            }
        }

        debug!("persistence worker stopped");
    }

    async fn flush(&self) {
        let store = Arc::clone(&self.store);
        match tokio::task::spawn_blocking(move || store.flush()).await {
            Ok(Ok(true)) => debug!("profiles flushed"),
            Ok(Ok(false)) => {}
            // The store already logged it and stays dirty for the next flush.
            Ok(Err(_)) => {}
            Err(e) => warn!(error = %e, "profile flush task failed"),
        }
    }

    async fn register(&self, caller: ConnectionId, account: AccountName, password: String) {
        let store = Arc::clone(&self.store);
        let name = account.clone();
        let result = tokio::task::spawn_blocking(move || store.create(&name, &password)).await;

        let notice = match result {
            Ok(Ok(())) => {
                info!(conn = %caller, %account, "account registered");
                Notice::AccountCreated(account)
            }
            Ok(Err(e)) => {
                debug!(conn = %caller, %account, error = %e, "registration failed");
                AuthError::from(e).notice()
            }
            Err(e) => {
                warn!(conn = %caller, %account, error = %e, "registration task failed");
                Notice::TryAgainLater
            }
        };
        self.host.send_notice(caller, &notice);
    }
}

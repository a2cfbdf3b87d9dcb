//! The notifier handle and its delivery worker.
//!
//! ```text
//! caller ──notify()──► mpsc ──► NotifyWorker ──spawn──► deliver() ──POST──► supervisor
//!   (never waits)                 (one task)          (one task per dispatch,
//!                                                       sleeps between retries)
//! ```
//!
//! `notify` and `push_roster` only push onto an unbounded channel, so they
//! never block and never fail from the caller's point of view. Each
//! dispatch gets its own task, so a supervisor that's slow or down delays
//! only its own retries.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::mpsc;
use warden_protocol::{EventPayload, NotifyEvent, ReconcilePayload, RosterEntry};

use crate::{NotifyConfig, NotifyError, RetryPolicy};

/// One queued notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// A single connection's transition.
    Event(EventPayload),
    /// The full online roster.
    Roster(ReconcilePayload),
}

impl Dispatch {
    /// The event name carried in the payload.
    pub fn event(&self) -> NotifyEvent {
        match self {
            Self::Event(payload) => payload.event,
            Self::Roster(payload) => payload.event,
        }
    }
}

/// Handle for queuing supervisor notifications.
///
/// Cheap to clone. A disabled notifier (no supervisor configured) accepts
/// every call and drops it.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: Option<mpsc::UnboundedSender<Dispatch>>,
}

impl Notifier {
    /// Starts the delivery worker on the current Tokio runtime.
    ///
    /// Returns a disabled notifier when `config.supervisor_url` is `None`.
    ///
    /// # Errors
    /// Returns [`NotifyError::Transport`] if the HTTP client can't be built.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn spawn(config: NotifyConfig) -> Result<Self, NotifyError> {
        if config.supervisor_url.is_none() {
            tracing::info!("no supervisor configured, notifications disabled");
            return Ok(Self::disabled());
        }

        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()?;

        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = NotifyWorker {
            client,
            config,
            receiver,
        };
        tokio::spawn(worker.run());

        Ok(Self {
            sender: Some(sender),
        })
    }

    /// A notifier that drops everything.
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// A notifier whose dispatches land on the returned receiver instead of
    /// the network. Lets callers route or inspect notifications themselves.
    pub fn detached() -> (Self, mpsc::UnboundedReceiver<Dispatch>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// Returns `false` for a disabled notifier.
    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Queues a single-event notification.
    pub fn notify(&self, event: NotifyEvent, player: impl Into<String>, ip: impl Into<String>) {
        self.enqueue(Dispatch::Event(EventPayload {
            event,
            player: player.into(),
            ip: ip.into(),
            timestamp: now_millis(),
        }));
    }

    /// Queues a reconciliation push of the full roster.
    pub fn push_roster(&self, players: Vec<RosterEntry>) {
        self.enqueue(Dispatch::Roster(ReconcilePayload::new(
            players,
            now_millis(),
        )));
    }

    fn enqueue(&self, dispatch: Dispatch) {
        let Some(sender) = &self.sender else {
            tracing::trace!(event = %dispatch.event(), "notifier disabled, dropping");
            return;
        };
        if sender.send(dispatch).is_err() {
            tracing::debug!("notify worker stopped, dropping notification");
        }
    }
}

/// Owns the HTTP client and drains the dispatch queue.
struct NotifyWorker {
    client: reqwest::Client,
    config: NotifyConfig,
    receiver: mpsc::UnboundedReceiver<Dispatch>,
}

impl NotifyWorker {
    async fn run(mut self) {
        tracing::debug!("notify worker started");

        while let Some(dispatch) = self.receiver.recv().await {
            let url = match &dispatch {
                Dispatch::Event(_) => self.config.supervisor_url.clone(),
                Dispatch::Roster(_) => self.config.roster_url().map(str::to_owned),
            };
            let Some(url) = url else {
                continue;
            };
            let client = self.client.clone();
            let policy = self.config.retry;

            tokio::spawn(async move {
                let result = match &dispatch {
                    Dispatch::Event(payload) => deliver(&client, &url, payload, policy).await,
                    Dispatch::Roster(payload) => deliver(&client, &url, payload, policy).await,
                };
                report(&dispatch, result);
            });
        }

        tracing::debug!("notify worker stopped");
    }
}

/// Logs the outcome of one dispatch. Exhaustion is the only warning.
fn report(dispatch: &Dispatch, result: Result<u32, NotifyError>) {
    let player = match dispatch {
        Dispatch::Event(payload) => payload.player.as_str(),
        Dispatch::Roster(_) => "",
    };
    match result {
        Ok(attempts) => {
            tracing::debug!(event = %dispatch.event(), player, attempts, "notification delivered");
        }
        Err(e) => {
            tracing::warn!(event = %dispatch.event(), player, error = %e, "notification dropped");
        }
    }
}

/// POSTs `body` as JSON to `url`, retrying per `policy`.
///
/// Returns the number of attempts it took on success, or
/// [`NotifyError::Exhausted`] once `policy.max_attempts()` have failed.
/// Sleeps between attempts; never call this from a context that must
/// not wait.
pub async fn deliver<T>(
    client: &reqwest::Client,
    url: &str,
    body: &T,
    policy: RetryPolicy,
) -> Result<u32, NotifyError>
where
    T: Serialize + ?Sized,
{
    let max_attempts = policy.max_attempts();
    let mut last_error = None;

    for attempt in 1..=max_attempts {
        match post_once(client, url, body).await {
            Ok(()) => return Ok(attempt),
            Err(e) => {
                tracing::debug!(attempt, max_attempts, error = %e, "notification attempt failed");
                last_error = Some(e);
            }
        }
        if attempt < max_attempts {
            tokio::time::sleep(policy.delay_after(attempt)).await;
        }
    }

    Err(NotifyError::Exhausted {
        attempts: max_attempts,
        last_error: last_error.map(|e| e.to_string()).unwrap_or_default(),
    })
}

async fn post_once<T>(client: &reqwest::Client, url: &str, body: &T) -> Result<(), NotifyError>
where
    T: Serialize + ?Sized,
{
    let response = client.post(url).json(body).send().await?;
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(NotifyError::Status(status.as_u16()))
    }
}

/// Milliseconds since the Unix epoch, or 0 if the clock is before it.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_notifier_accepts_calls() {
        let notifier = Notifier::disabled();
        assert!(!notifier.is_enabled());
        notifier.notify(NotifyEvent::Logged, "alice", "10.0.0.1");
        notifier.push_roster(Vec::new());
    }

    #[test]
    fn test_detached_notify_queues_event_payload() {
        let (notifier, mut rx) = Notifier::detached();

        notifier.notify(NotifyEvent::Deauthorize, "bob", "10.0.0.2");

        let Dispatch::Event(payload) = rx.try_recv().unwrap() else {
            panic!("expected an event dispatch");
        };
        assert_eq!(payload.event, NotifyEvent::Deauthorize);
        assert_eq!(payload.player, "bob");
        assert_eq!(payload.ip, "10.0.0.2");
        assert!(payload.timestamp > 0);
    }

    #[test]
    fn test_detached_push_roster_queues_reconcile() {
        let (notifier, mut rx) = Notifier::detached();
        let roster = vec![RosterEntry {
            name: "alice".into(),
            ip: "10.0.0.1".into(),
        }];

        notifier.push_roster(roster.clone());

        let dispatch = rx.try_recv().unwrap();
        assert_eq!(dispatch.event(), NotifyEvent::Reconcile);
        let Dispatch::Roster(payload) = dispatch else {
            panic!("expected a roster dispatch");
        };
        assert_eq!(payload.players, roster);
    }

    #[test]
    fn test_notify_after_receiver_dropped_does_not_panic() {
        let (notifier, rx) = Notifier::detached();
        drop(rx);
        notifier.notify(NotifyEvent::Connected, "", "10.0.0.3");
    }
}

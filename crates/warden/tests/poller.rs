//! PresencePoller: every disconnect is reported exactly once, whichever
//! way the host noticed it.

mod common;

use std::sync::Arc;

use common::*;
use warden::PresencePoller;
use warden_protocol::{Action, NotifyEvent};

fn poller(fx: &Fixture) -> PresencePoller {
    PresencePoller::new(Arc::clone(&fx.gateway))
}

fn deauthorized(events: &[(NotifyEvent, String, String)]) -> Vec<(String, String)> {
    events
        .iter()
        .filter(|(event, _, _)| *event == NotifyEvent::Deauthorize)
        .map(|(_, player, ip)| (player.clone(), ip.clone()))
        .collect()
}

#[test]
fn test_poll_once_vanished_connection_deauthorized_once() {
    let mut fx = fixture();
    fx.create_account("alice", "pw");
    let mut poller = poller(&fx);
    fx.join(cid(1), "10.0.0.1");
    fx.join(cid(2), "10.0.0.2");
    fx.command(cid(1), "/login alice pw");
    fx.host.set_live(&[(cid(1), "10.0.0.1"), (cid(2), "10.0.0.2")]);
    poller.poll_once();
    fx.drain_events();

    // The host lost A without calling back.
    fx.host.set_live(&[(cid(2), "10.0.0.2")]);
    let diff = poller.poll_once();

    assert_eq!(diff.disconnected.len(), 1);
    assert_eq!(diff.disconnected[0].id, cid(1));
    assert_eq!(
        deauthorized(&fx.drain_events()),
        vec![("alice".to_string(), "10.0.0.1".to_string())]
    );
    assert!(fx.sessions.get(cid(1)).is_none());
    assert!(!fx.sessions.is_bound(&name("alice")));
    assert!(fx.sessions.get(cid(2)).is_some());

    poller.poll_once();
    assert!(fx.drain_events().is_empty());
}

#[test]
fn test_poll_once_after_quit_uses_tombstone_account() {
    let mut fx = fixture();
    fx.create_account("alice", "pw");
    let mut poller = poller(&fx);
    fx.join(cid(1), "10.0.0.1");
    fx.command(cid(1), "/login alice pw");
    fx.host.set_live(&[(cid(1), "10.0.0.1")]);
    poller.poll_once();
    fx.drain_events();

    fx.dispatch(cid(1), Action::Quit);
    fx.host.set_live(&[]);
    poller.poll_once();

    assert_eq!(
        deauthorized(&fx.drain_events()),
        vec![("alice".to_string(), "10.0.0.1".to_string())]
    );
    poller.poll_once();
    assert!(fx.drain_events().is_empty());
}

#[test]
fn test_poll_once_quit_while_still_listed_keeps_account() {
    let mut fx = fixture();
    fx.create_account("alice", "pw");
    let mut poller = poller(&fx);
    fx.join(cid(1), "10.0.0.1");
    fx.command(cid(1), "/login alice pw");
    fx.host.set_live(&[(cid(1), "10.0.0.1")]);
    poller.poll_once();
    fx.drain_events();

    // The host fires Quit but still lists the connection for one poll.
    fx.dispatch(cid(1), Action::Quit);
    let diff = poller.poll_once();
    assert!(diff.is_empty());
    assert!(fx.drain_events().is_empty());
    assert!(fx.sessions.get(cid(1)).is_none());

    fx.host.set_live(&[]);
    poller.poll_once();

    assert_eq!(
        deauthorized(&fx.drain_events()),
        vec![("alice".to_string(), "10.0.0.1".to_string())]
    );
    poller.poll_once();
    assert!(fx.drain_events().is_empty());
}

#[test]
fn test_poll_once_short_lived_connection_still_reported() {
    let mut fx = fixture();
    fx.create_account("alice", "pw");
    let mut poller = poller(&fx);

    // Joins, logs in and quits between two polls.
    fx.join(cid(1), "10.0.0.1");
    fx.command(cid(1), "/login alice pw");
    fx.dispatch(cid(1), Action::Quit);
    fx.drain_events();
    let diff = poller.poll_once();

    assert!(diff.is_empty());
    assert_eq!(
        deauthorized(&fx.drain_events()),
        vec![("alice".to_string(), "10.0.0.1".to_string())]
    );
    poller.poll_once();
    assert!(fx.drain_events().is_empty());
}

#[test]
fn test_poll_once_short_lived_unauthenticated_connection_is_silent() {
    let mut fx = fixture();
    let mut poller = poller(&fx);
    fx.join(cid(1), "10.0.0.1");
    fx.dispatch(cid(1), Action::Quit);
    fx.drain_events();

    poller.poll_once();

    assert!(fx.drain_events().is_empty());
}

#[test]
fn test_poll_once_departure_without_account_sends_empty_player() {
    let mut fx = fixture();
    let mut poller = poller(&fx);
    fx.join(cid(1), "10.0.0.1");
    fx.host.set_live(&[(cid(1), "10.0.0.1")]);
    poller.poll_once();
    fx.drain_events();

    fx.host.set_live(&[]);
    poller.poll_once();

    assert_eq!(
        deauthorized(&fx.drain_events()),
        vec![(String::new(), "10.0.0.1".to_string())]
    );
}

#[test]
fn test_poll_once_missed_connect_opens_session() {
    let fx = fixture();
    let mut poller = poller(&fx);
    fx.host.set_live(&[(cid(5), "10.0.0.5")]);

    let diff = poller.poll_once();

    assert_eq!(diff.connected.len(), 1);
    let session = fx.sessions.get(cid(5)).expect("session opened by poll");
    assert_eq!(session.remote_address, "10.0.0.5");
    assert!(!session.is_authenticated());
}

#[test]
fn test_poll_once_stable_population_reports_nothing() {
    let mut fx = fixture();
    let mut poller = poller(&fx);
    fx.join(cid(1), "10.0.0.1");
    fx.host.set_live(&[(cid(1), "10.0.0.1")]);
    poller.poll_once();
    fx.drain_events();

    for _ in 0..3 {
        assert!(poller.poll_once().is_empty());
    }
    assert!(fx.drain_events().is_empty());
}

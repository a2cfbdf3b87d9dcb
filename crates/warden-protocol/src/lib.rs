//! Shared vocabulary for Warden.
//!
//! This crate defines the types every other layer speaks:
//!
//! - **Identity** ([`ConnectionId`], [`AccountName`]) — who is connected
//!   and which account they claim.
//! - **Host events** ([`HostEvent`], [`Action`], [`Position`]) — what a
//!   connection is trying to do, as reported by the session host.
//! - **Notices** ([`Notice`]) — short messages shown back to a connection.
//! - **Wire payloads** ([`EventPayload`], [`ReconcilePayload`],
//!   [`OnlineReport`]) — the JSON exchanged with the supervisor and with
//!   status pollers.
//!
//! # Architecture
//!
//! The protocol layer does no I/O and holds no state. It sits below the
//! session, store, notify and presence layers.
//!
//! ```text
//! Host callbacks → Protocol (HostEvent) → Gatekeeper / AuthGateway
//! ```

mod types;
mod wire;

pub use types::{AccountName, Action, ConnectionId, HostEvent, Notice, Position};
pub use wire::{
    EventPayload, NOT_LOGGED_IN, NotifyEvent, OnlineReport, ReconcilePayload,
    RosterEntry,
};

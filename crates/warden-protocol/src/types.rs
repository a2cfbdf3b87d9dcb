//! Core types shared by every Warden layer.
//!
//! These are the nouns of the gateway: who is connected (`ConnectionId`),
//! which durable identity they claim (`AccountName`), what they are trying
//! to do (`Action`), and what we tell them back (`Notice`).
//!
//! Nothing in here performs I/O. The host adapter turns its own callbacks
//! into [`HostEvent`]s and the rest of the stack only ever sees these types.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identifier for one live connection on the host.
///
/// Stable for the lifetime of the connection. The host chooses the value;
/// Warden only compares and hashes it.
///
/// `#[serde(transparent)]` keeps the JSON form a plain number.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// The name of a durable account.
///
/// Account names are case-insensitive, so the constructor normalizes to
/// lowercase once and every comparison afterwards is a plain string compare.
/// `Admin`, `ADMIN` and `admin` are the same account.
///
/// Serialized as a plain string. Deserializing goes through `From<String>`
/// so names read back from disk are normalized too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct AccountName(String);

impl AccountName {
    /// The well-known privileged account provisioned on first run.
    pub const SUPERUSER: &'static str = "admin";

    /// Creates a normalized account name.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    /// The bootstrap superuser's name.
    pub fn superuser() -> Self {
        Self(Self::SUPERUSER.to_string())
    }

    /// Returns `true` if this is the well-known superuser account.
    pub fn is_superuser(&self) -> bool {
        self.0 == Self::SUPERUSER
    }

    /// Returns the normalized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for a name that is empty after trimming.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for AccountName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for AccountName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<AccountName> for String {
    fn from(value: AccountName) -> Self {
        value.0
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// World geometry
// ---------------------------------------------------------------------------

/// A point in the host's world.
///
/// `x` and `z` are the horizontal axes, `y` is vertical. The gatekeeper
/// only cares about which axes changed between two positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Position {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Returns `true` if `other` differs from `self` on either horizontal axis.
    pub fn moved_horizontally_to(&self, other: &Position) -> bool {
        self.x != other.x || self.z != other.z
    }
}

// ---------------------------------------------------------------------------
// Host events
// ---------------------------------------------------------------------------

/// Something a connection attempted, as reported by the host.
///
/// Every host callback maps to exactly one variant. The router evaluates
/// all of them through a single decision function instead of one handler
/// per callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A new connection was accepted. `address` may be empty when the
    /// host can't tell.
    Connect { address: String },

    /// The connection finished joining the world and can see/act.
    Join,

    /// The connection wants to move from `from` to `to`.
    Move { from: Position, to: Position },

    /// The connection wants to drop an item or resource.
    DropItem,

    /// The connection typed a command. The raw line, leading slash optional.
    Command(String),

    /// The connection's avatar is about to take damage.
    Damage,

    /// The connection sent a chat line.
    Chat(String),

    /// The connection left.
    Quit,
}

impl Action {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Join => "join",
            Self::Move { .. } => "move",
            Self::DropItem => "drop_item",
            Self::Command(_) => "command",
            Self::Damage => "damage",
            Self::Chat(_) => "chat",
            Self::Quit => "quit",
        }
    }
}

/// A host notification: which connection did what.
#[derive(Debug, Clone, PartialEq)]
pub struct HostEvent {
    pub connection: ConnectionId,
    pub action: Action,
}

impl HostEvent {
    pub fn new(connection: ConnectionId, action: Action) -> Self {
        Self { connection, action }
    }
}

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

/// A short, user-visible message delivered to one connection.
///
/// The host decides how to render these (chat line, title, toast). The
/// `Display` impl gives the default English text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Shown on join while unauthenticated.
    LoginPrompt,
    /// A restricted command was attempted before logging in.
    AuthenticateFirst,
    LoginUsage,
    RegisterUsage,
    LoggedIn(AccountName),
    InvalidCredentials,
    AlreadyLoggedIn,
    /// The session was switched away from this account.
    LoggedOutFrom(AccountName),
    LoggedOut,
    NotLoggedIn,
    AlreadyExists,
    RegistrationClosed,
    AccountCreated(AccountName),
    ElevationGranted,
    ElevationRevoked,
    /// Persistence failed; the operation did not happen.
    TryAgainLater,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoginPrompt => write!(f, "Please login with /login <user> <pass>"),
            Self::AuthenticateFirst => write!(f, "Please login first."),
            Self::LoginUsage => write!(f, "Usage: /login <user> <pass>"),
            Self::RegisterUsage => write!(f, "Usage: /register <user> <pass>"),
            Self::LoggedIn(name) => write!(f, "Logged in as {name}"),
            Self::InvalidCredentials => write!(f, "Invalid credentials."),
            Self::AlreadyLoggedIn => write!(f, "That account is already logged in."),
            Self::LoggedOutFrom(name) => write!(f, "You were logged out from '{name}'."),
            Self::LoggedOut => write!(f, "You have been logged out."),
            Self::NotLoggedIn => write!(f, "You are not logged in."),
            Self::AlreadyExists => write!(f, "User already exists."),
            Self::RegistrationClosed => write!(f, "Only the admin can register new users."),
            Self::AccountCreated(name) => write!(f, "User {name} created successfully!"),
            Self::ElevationGranted => write!(f, "Admin privileges granted."),
            Self::ElevationRevoked => write!(f, "Admin privileges revoked."),
            Self::TryAgainLater => write!(f, "Something went wrong, please try again later."),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

//! Error types for the Warden meta-crate.

use std::path::PathBuf;

use warden_notify::NotifyError;
use warden_protocol::{AccountName, Notice};
use warden_session::SessionError;
use warden_store::StoreError;

/// Why a login, logout or registration was refused.
///
/// Every variant maps to a [`Notice`] via [`AuthError::notice`]; the
/// event router shows that notice and never propagates the error further.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account is bound to another live session.
    #[error("account {0} is already logged in")]
    AlreadyLoggedIn(AccountName),

    #[error("session is not logged in")]
    NotLoggedIn,

    #[error("account {0} already exists")]
    AlreadyExists(AccountName),

    /// The caller isn't allowed to create accounts.
    #[error("registration is closed")]
    RegistrationClosed,

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AlreadyExists(name) => Self::AlreadyExists(name),
            other => Self::Store(other),
        }
    }
}

impl AuthError {
    /// The notice shown to the connection that caused this error.
    pub fn notice(&self) -> Notice {
        match self {
            Self::InvalidCredentials => Notice::InvalidCredentials,
            Self::AlreadyLoggedIn(_) => Notice::AlreadyLoggedIn,
            Self::NotLoggedIn => Notice::NotLoggedIn,
            Self::AlreadyExists(_) => Notice::AlreadyExists,
            Self::RegistrationClosed => Notice::RegistrationClosed,
            Self::Session(SessionError::AlreadyBound(_)) => Notice::AlreadyLoggedIn,
            Self::Session(SessionError::NotBound(_)) => Notice::NotLoggedIn,
            Self::Store(StoreError::InvalidName) => Notice::RegisterUsage,
            Self::Session(_) | Self::Store(_) => Notice::TryAgainLater,
        }
    }
}

/// Errors loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum WardenError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Binding or serving the status endpoint failed.
    #[error("status endpoint: {0}")]
    Io(#[from] std::io::Error),
}

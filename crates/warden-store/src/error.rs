//! Error types for the credential store.

use warden_protocol::AccountName;

/// Errors that can occur while reading or writing accounts.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An account with this name already exists.
    #[error("account {0} already exists")]
    AlreadyExists(AccountName),

    /// No account with this name exists.
    #[error("account {0} not found")]
    NotFound(AccountName),

    /// The name is empty after normalization.
    #[error("account name must not be empty")]
    InvalidName,

    /// Reading or writing the backing document failed. The in-memory
    /// registry is left exactly as it was before the operation.
    #[error("persistence failure: {0}")]
    Persistence(#[from] std::io::Error),

    /// The backing document exists but couldn't be parsed.
    #[error("account document is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

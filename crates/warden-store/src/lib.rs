//! Durable account registry for Warden.
//!
//! - [`CredentialStore`] — create accounts, verify passwords, keep profiles
//! - [`DocumentStore`] — where the registry lives ([`JsonFileStore`],
//!   [`MemoryStore`])
//! - [`AccountRecord`] / [`Profile`] — what is stored per account
//!
//! Passwords are stored as `hex(SHA-256(salt ‖ password))` with a random
//! per-account salt. The store never deletes accounts.

mod account;
mod document;
mod error;
mod password;
mod store;

pub use account::{AccountRecord, BootstrapSeed, Profile};
pub use document::{AccountsDocument, DocumentStore, JsonFileStore, MemoryStore};
pub use error::StoreError;
pub use password::{generate_salt, hash_password, verify_password};
pub use store::CredentialStore;

//! Backends that persist the account document.
//!
//! The registry is one document: every account keyed by name. Backends
//! only know how to load and save that document as a whole; the
//! [`CredentialStore`](crate::CredentialStore) decides what goes in it.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize};
use warden_protocol::AccountName;

use crate::{AccountRecord, StoreError};

/// The persisted registry.
///
/// ```json
/// {"users": {"admin": {"password": "…", "salt": "…", "superuser": true}}}
/// ```
///
/// Keys are case-folded on load. A hand-edited document holding both
/// `"Alice"` and `"alice"` keeps the entry whose raw key sorts last and
/// logs a warning for the one it drops.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountsDocument {
    #[serde(default, deserialize_with = "fold_user_keys")]
    pub users: BTreeMap<AccountName, AccountRecord>,
}

fn fold_user_keys<'de, D>(deserializer: D) -> Result<BTreeMap<AccountName, AccountRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, AccountRecord>::deserialize(deserializer)?;
    let mut users = BTreeMap::new();
    for (key, record) in raw {
        let name = AccountName::new(&key);
        if users.insert(name.clone(), record).is_some() {
            tracing::warn!(
                account = %name,
                key = %key,
                "account document has names differing only in case; keeping the later entry"
            );
        }
    }
    Ok(users)
}

/// Loads and saves the whole account document.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` because the store is shared between the host
/// callback thread, background workers, and the status endpoint.
pub trait DocumentStore: Send + Sync + 'static {
    /// Reads the document. A backend with nothing stored yet returns an
    /// empty document rather than an error.
    fn load(&self) -> Result<AccountsDocument, StoreError>;

    /// Replaces the stored document. Must be all-or-nothing: a failed
    /// save leaves the previous document intact.
    fn save(&self, document: &AccountsDocument) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// JSON file
// ---------------------------------------------------------------------------

/// Stores the document as pretty-printed JSON in a single file.
///
/// Saves write a sibling temp file and rename it over the target, so a
/// crash mid-write never leaves a truncated document behind.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl DocumentStore for JsonFileStore {
    fn load(&self) -> Result<AccountsDocument, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no account document yet");
                Ok(AccountsDocument::default())
            }
            Err(e) => Err(StoreError::Persistence(e)),
        }
    }

    fn save(&self, document: &AccountsDocument) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let bytes = serde_json::to_vec_pretty(document)?;
        let temp = self.temp_path();
        fs::write(&temp, bytes)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// In memory
// ---------------------------------------------------------------------------

/// Keeps the document in memory. Nothing survives the process.
///
/// Writes can be switched off with [`set_writable`](Self::set_writable),
/// after which every save fails with a persistence error. Handy for
/// maintenance windows and for exercising failure paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Mutex<AccountsDocument>,
    read_only: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an existing document.
    pub fn with_document(document: AccountsDocument) -> Self {
        Self {
            document: Mutex::new(document),
            read_only: AtomicBool::new(false),
        }
    }

    pub fn set_writable(&self, writable: bool) {
        self.read_only.store(!writable, Ordering::SeqCst);
    }

    /// Returns a copy of what was last saved.
    pub fn document(&self) -> AccountsDocument {
        self.document.lock().clone()
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self) -> Result<AccountsDocument, StoreError> {
        Ok(self.document.lock().clone())
    }

    fn save(&self, document: &AccountsDocument) -> Result<(), StoreError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(StoreError::Persistence(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "account store is read-only",
            )));
        }
        *self.document.lock() = document.clone();
        Ok(())
    }
}

/// Shared stores work too, so callers can keep a handle for inspection.
impl<T: DocumentStore> DocumentStore for std::sync::Arc<T> {
    fn load(&self) -> Result<AccountsDocument, StoreError> {
        (**self).load()
    }

    fn save(&self, document: &AccountsDocument) -> Result<(), StoreError> {
        (**self).save(document)
    }
}

//! The credential store: the durable account registry.
//!
//! Reads are served from an in-memory copy of the document. Account
//! writes (`create`, `save_profile`, bootstrap) build the next version of
//! the affected record, persist the whole document through the
//! [`DocumentStore`], and only then publish it in memory. If persisting
//! fails, the in-memory registry is untouched and the caller gets
//! [`StoreError::Persistence`].
//!
//! Profiles have a second, write-behind path: [`CredentialStore::stage_profile`]
//! updates memory immediately and marks the store dirty, and a later
//! [`CredentialStore::flush`] writes the latest state. Every save happens
//! under one writer mutex and always writes what memory holds at that
//! moment, so saves never land out of order.
//!
//! Writers are serialized by a dedicated mutex so the backend I/O never
//! happens while the read lock is blocked; `verify` and `exists` stay
//! fast while a save is in flight.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use warden_protocol::AccountName;

use crate::document::{AccountsDocument, DocumentStore, MemoryStore};
use crate::{AccountRecord, BootstrapSeed, Profile, StoreError};

type Accounts = BTreeMap<AccountName, AccountRecord>;

/// Durable registry of accounts: name → {hash, salt, superuser, profile}.
pub struct CredentialStore {
    accounts: RwLock<Accounts>,
    writer: Mutex<()>,
    backend: Box<dyn DocumentStore>,
    /// Bumped by every staged profile.
    staged: AtomicU64,
    /// Value of `staged` covered by the last successful save.
    flushed: AtomicU64,
}

impl CredentialStore {
    /// Opens a store, loading whatever the backend already holds.
    ///
    /// # Errors
    /// Returns [`StoreError::Corrupt`] or [`StoreError::Persistence`] if
    /// the existing document can't be read.
    pub fn open(backend: impl DocumentStore) -> Result<Self, StoreError> {
        let document = backend.load()?;
        tracing::info!(accounts = document.users.len(), "credential store opened");
        Ok(Self::with_accounts(document.users, Box::new(backend)))
    }

    /// A store backed by nothing but memory.
    pub fn in_memory() -> Self {
        Self::with_accounts(Accounts::new(), Box::new(MemoryStore::new()))
    }

    fn with_accounts(accounts: Accounts, backend: Box<dyn DocumentStore>) -> Self {
        Self {
            accounts: RwLock::new(accounts),
            writer: Mutex::new(()),
            backend,
            staged: AtomicU64::new(0),
            flushed: AtomicU64::new(0),
        }
    }

    /// Returns `true` if an account with this name exists.
    pub fn exists(&self, name: &AccountName) -> bool {
        self.accounts.read().contains_key(name)
    }

    /// Creates an account with a fresh random salt.
    ///
    /// # Errors
    /// - [`StoreError::InvalidName`] — empty name
    /// - [`StoreError::AlreadyExists`] — name taken
    /// - [`StoreError::Persistence`] — the durable write failed
    pub fn create(&self, name: &AccountName, password: &str) -> Result<(), StoreError> {
        if name.is_empty() {
            return Err(StoreError::InvalidName);
        }
        self.commit(|accounts| {
            if accounts.contains_key(name) {
                return Err(StoreError::AlreadyExists(name.clone()));
            }
            Ok(Some((name.clone(), AccountRecord::with_password(password))))
        })?;
        tracing::info!(account = %name, "account created");
        Ok(())
    }

    /// Checks a password. Unknown accounts and records without a salt or
    /// hash return `false`; this never fails.
    pub fn verify(&self, name: &AccountName, password: &str) -> bool {
        self.accounts
            .read()
            .get(name)
            .is_some_and(|record| record.verify(password))
    }

    /// Returns `true` if the account exists and carries the superuser flag.
    pub fn is_superuser(&self, name: &AccountName) -> bool {
        self.accounts
            .read()
            .get(name)
            .is_some_and(|record| record.superuser)
    }

    /// Returns a copy of an account's record.
    pub fn record(&self, name: &AccountName) -> Option<AccountRecord> {
        self.accounts.read().get(name).cloned()
    }

    /// Replaces an account's profile and persists it before returning.
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] — no such account
    /// - [`StoreError::Persistence`] — the durable write failed
    pub fn save_profile(&self, name: &AccountName, profile: Profile) -> Result<(), StoreError> {
        self.commit(|accounts| {
            let mut record = accounts
                .get(name)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(name.clone()))?;
            record.profile = profile;
            Ok(Some((name.clone(), record)))
        })?;
        tracing::debug!(account = %name, "profile saved");
        Ok(())
    }

    /// Replaces an account's profile in memory only. Readers see it at
    /// once; it reaches the backend on the next [`flush`](Self::flush) or
    /// account write.
    ///
    /// # Errors
    /// Returns [`StoreError::NotFound`] if there is no such account.
    pub fn stage_profile(&self, name: &AccountName, profile: Profile) -> Result<(), StoreError> {
        {
            let mut accounts = self.accounts.write();
            let record = accounts
                .get_mut(name)
                .ok_or_else(|| StoreError::NotFound(name.clone()))?;
            record.profile = profile;
        }
        self.staged.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(account = %name, "profile staged");
        Ok(())
    }

    /// Returns `true` if staged profiles haven't been saved yet.
    pub fn is_dirty(&self) -> bool {
        self.staged.load(Ordering::SeqCst) != self.flushed.load(Ordering::SeqCst)
    }

    /// Saves the current in-memory registry if anything was staged since
    /// the last save. Returns `Ok(false)` when there was nothing to do.
    ///
    /// On failure the store stays dirty, so the next flush tries again.
    ///
    /// # Errors
    /// Returns [`StoreError::Persistence`] if the backend write failed.
    pub fn flush(&self) -> Result<bool, StoreError> {
        let _writer = self.writer.lock();
        let generation = self.staged.load(Ordering::SeqCst);
        if generation == self.flushed.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let document = AccountsDocument {
            users: self.accounts.read().clone(),
        };
        if let Err(e) = self.backend.save(&document) {
            tracing::warn!(error = %e, "failed to flush account document");
            return Err(e);
        }
        self.flushed.store(generation, Ordering::SeqCst);
        Ok(true)
    }

    /// Returns an account's profile, or `None` if the account is unknown.
    pub fn load_profile(&self, name: &AccountName) -> Option<Profile> {
        self.accounts
            .read()
            .get(name)
            .map(|record| record.profile.clone())
    }

    /// Provisions the well-known superuser from `seed` if it is missing.
    ///
    /// Idempotent: returns `Ok(true)` when the account was created and
    /// `Ok(false)` when it already existed (its credentials are left alone).
    pub fn ensure_bootstrap_account(&self, seed: &BootstrapSeed) -> Result<bool, StoreError> {
        let name = AccountName::superuser();
        let mut created = false;
        self.commit(|accounts| {
            if accounts.contains_key(&name) {
                return Ok(None);
            }
            created = true;
            Ok(Some((name.clone(), seed.clone().into_record())))
        })?;
        if created {
            tracing::info!(account = %name, "superuser entry created");
        }
        Ok(created)
    }

    /// Number of accounts, including the bootstrap account.
    pub fn len(&self) -> usize {
        self.accounts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.read().is_empty()
    }

    /// Asks `plan` for the record to write, persists a document with it,
    /// then publishes that one record. Nothing is published if `plan` or
    /// the save fails; `Ok(None)` from `plan` writes nothing.
    ///
    /// Only the planned record is published, so profiles staged while the
    /// save was running are kept.
    fn commit<F>(&self, plan: F) -> Result<(), StoreError>
    where
        F: FnOnce(&Accounts) -> Result<Option<(AccountName, AccountRecord)>, StoreError>,
    {
        let _writer = self.writer.lock();
        let generation = self.staged.load(Ordering::SeqCst);
        let mut users = self.accounts.read().clone();
        let Some((name, record)) = plan(&users)? else {
            return Ok(());
        };
        users.insert(name.clone(), record.clone());

        let document = AccountsDocument { users };
        if let Err(e) = self.backend.save(&document) {
            tracing::warn!(error = %e, "failed to persist account document");
            return Err(e);
        }
        self.accounts.write().insert(name, record);
        self.flushed.store(generation, Ordering::SeqCst);
        Ok(())
    }
}

// =========================================================================
// Tests
// =========================================================================

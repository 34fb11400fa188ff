//! Persistent wallet storage
//!
//! The wallet keeps exactly three string entries:
//!
//! | key                               | value                                |
//! |-----------------------------------|--------------------------------------|
//! | `shade_wallet_encrypted`          | encrypted seed blob                  |
//! | `shade_wallet_mnemonic_encrypted` | encrypted mnemonic blob              |
//! | `shade_wallet_index`              | active account index, decimal string |
//!
//! The encrypted seed is the source of truth for whether a wallet exists.

use crate::encryption::EncryptedBlob;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};
use thiserror::Error;

pub const ENCRYPTED_SEED_KEY: &str = "shade_wallet_encrypted";
pub const ENCRYPTED_MNEMONIC_KEY: &str = "shade_wallet_mnemonic_encrypted";
pub const ACTIVE_INDEX_KEY: &str = "shade_wallet_index";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Db(#[from] sled::Error),

    #[error("Stored value for {0} is not valid UTF-8")]
    InvalidUtf8(String),

    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Durable string key-value store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// In-process store. Share it through an `Arc` to survive a session restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.read().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// On-disk store backed by sled. Every write is flushed before returning.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open or create a store at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }
}

impl KeyValueStore for SledStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.db.get(key.as_bytes())? {
            Some(value) => String::from_utf8(value.to_vec())
                .map(Some)
                .map_err(|_| StorageError::InvalidUtf8(key.to_string())),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.db.insert(key.as_bytes(), value.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.db.remove(key.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }
}

/// Typed access to the wallet's entries on top of a [`KeyValueStore`].
pub struct WalletStore<S> {
    store: S,
}

impl<S: KeyValueStore> WalletStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn inner(&self) -> &S {
        &self.store
    }

    pub fn has_wallet(&self) -> Result<bool, StorageError> {
        Ok(self.store.get(ENCRYPTED_SEED_KEY)?.is_some())
    }

    pub fn seed_blob(&self) -> Result<Option<EncryptedBlob>, StorageError> {
        Ok(self
            .store
            .get(ENCRYPTED_SEED_KEY)?
            .map(EncryptedBlob::from_base64))
    }

    pub fn mnemonic_blob(&self) -> Result<Option<EncryptedBlob>, StorageError> {
        Ok(self
            .store
            .get(ENCRYPTED_MNEMONIC_KEY)?
            .map(EncryptedBlob::from_base64))
    }

    /// Persist a new wallet and reset the active index to 0.
    ///
    /// The seed is written last so a partial write never looks like a wallet.
    /// On failure everything written so far is removed again.
    pub fn save_wallet(
        &self,
        seed: &EncryptedBlob,
        mnemonic: &EncryptedBlob,
    ) -> Result<(), StorageError> {
        let result = self
            .store
            .set(ENCRYPTED_MNEMONIC_KEY, mnemonic.as_str())
            .and_then(|_| self.store.set(ACTIVE_INDEX_KEY, "0"))
            .and_then(|_| self.store.set(ENCRYPTED_SEED_KEY, seed.as_str()));

        if let Err(e) = result {
            log::warn!("Failed to persist wallet, rolling back: {}", e);
            if let Err(rollback) = self.clear() {
                log::warn!("Rollback after failed save also failed: {}", rollback);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Active account index. An absent or unparsable value reads as `None`.
    pub fn active_index(&self) -> Result<Option<u32>, StorageError> {
        Ok(self
            .store
            .get(ACTIVE_INDEX_KEY)?
            .and_then(|value| value.trim().parse().ok()))
    }

    pub fn set_active_index(&self, index: u32) -> Result<(), StorageError> {
        self.store.set(ACTIVE_INDEX_KEY, &index.to_string())
    }

    /// Remove every wallet entry. The seed goes first.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.store.remove(ENCRYPTED_SEED_KEY)?;
        self.store.remove(ENCRYPTED_MNEMONIC_KEY)?;
        self.store.remove(ACTIVE_INDEX_KEY)?;
        Ok(())
    }
}

//! Storage Trait Definitions
//!
//! Defines abstract storage interfaces for the pool document and the
//! per-address ledger documents. Implementations can use JSON files
//! (production) or memory (testing).
//!
//! Stores hand out per-document guards. Any read-modify-write cycle must
//! hold the guard for that document from load until save.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;
use tokio::sync::OwnedMutexGuard;

use crate::types::{Ledger, PoolDocument};

/// Key of the single pool document in lock registries
pub const POOL_KEY: &str = "__pool__";

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("cannot access {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed document {key}: {message}")]
    Format { key: String, message: String },

    #[error("bad amount in {key}: {message}")]
    Conversion { key: String, message: String },
}

impl StorageError {
    pub fn not_found(key: impl Into<String>) -> Self {
        StorageError::Io {
            key: key.into(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "document does not exist"),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Exclusive access to one document until dropped
pub type DocumentGuard = OwnedMutexGuard<()>;

/// Pool document storage
///
/// Implementations:
/// - `FilePoolStore` - JSON file with atomic rewrites
/// - `MemoryPoolStore` - In-memory storage for testing
#[async_trait]
pub trait PoolStore: Send + Sync {
    /// Read the whole pool document
    async fn load(&self) -> StorageResult<PoolDocument>;

    /// Replace the whole pool document
    async fn save(&self, pool: &PoolDocument) -> StorageResult<()>;

    /// Serialize writers of the pool document
    async fn lock(&self) -> DocumentGuard;
}

/// Per-address ledger storage
///
/// Addresses are case-insensitive keys.
///
/// Implementations:
/// - `FileLedgerStore` - one JSON file per address
/// - `MemoryLedgerStore` - In-memory storage for testing
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Read the ledger of `address`
    async fn load(&self, address: &str) -> StorageResult<Ledger>;

    /// Replace the ledger of `address`
    async fn save(&self, address: &str, ledger: &Ledger) -> StorageResult<()>;

    /// Check whether a ledger exists for `address`
    async fn exists(&self, address: &str) -> StorageResult<bool>;

    /// Serialize writers of one ledger
    async fn lock(&self, address: &str) -> DocumentGuard;

    /// Create an empty ledger when none exists; returns true if created
    async fn init(&self, address: &str) -> StorageResult<bool> {
        let _guard = self.lock(address).await;
        if self.exists(address).await? {
            return Ok(false);
        }
        self.save(address, &Ledger::empty()).await?;
        Ok(true)
    }
}

/// Lowercase address used as the storage key
pub fn ledger_key(address: &str) -> String {
    address.trim().to_lowercase()
}

/// Registry of per-document async locks
#[derive(Debug, Clone, Default)]
pub struct DocumentLocks {
    inner: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl DocumentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`
    pub async fn acquire(&self, key: &str) -> DocumentGuard {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            map.entry(key.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

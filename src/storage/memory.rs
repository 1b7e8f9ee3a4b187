//! In-Memory Storage Implementations
//!
//! Provides in-memory storage for testing and development.
//! Data is lost when the process exits.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::traits::{
    ledger_key, DocumentGuard, DocumentLocks, LedgerStore, PoolStore, StorageError,
    StorageResult, POOL_KEY,
};
use crate::types::{Ledger, PoolDocument};

/// In-memory pool document
#[derive(Clone, Default)]
pub struct MemoryPoolStore {
    pool: Arc<RwLock<Option<PoolDocument>>>,
    locks: DocumentLocks,
}

impl MemoryPoolStore {
    /// Store without a pool document (loads fail as missing)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool(pool: PoolDocument) -> Self {
        Self {
            pool: Arc::new(RwLock::new(Some(pool))),
            locks: DocumentLocks::new(),
        }
    }

    /// Current document, if any
    pub async fn snapshot(&self) -> Option<PoolDocument> {
        self.pool.read().await.clone()
    }
}

#[async_trait]
impl PoolStore for MemoryPoolStore {
    async fn load(&self) -> StorageResult<PoolDocument> {
        self.pool
            .read()
            .await
            .clone()
            .ok_or_else(|| StorageError::not_found(POOL_KEY))
    }

    async fn save(&self, pool: &PoolDocument) -> StorageResult<()> {
        *self.pool.write().await = Some(pool.clone());
        Ok(())
    }

    async fn lock(&self) -> DocumentGuard {
        self.locks.acquire(POOL_KEY).await
    }
}

/// In-memory ledgers keyed by lowercase address
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    ledgers: Arc<RwLock<HashMap<String, Ledger>>>,
    locks: DocumentLocks,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a ledger directly
    pub async fn insert(&self, address: &str, ledger: Ledger) {
        self.ledgers.write().await.insert(ledger_key(address), ledger);
    }

    /// Number of stored ledgers
    pub async fn count(&self) -> usize {
        self.ledgers.read().await.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn load(&self, address: &str) -> StorageResult<Ledger> {
        let key = ledger_key(address);
        self.ledgers
            .read()
            .await
            .get(&key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn save(&self, address: &str, ledger: &Ledger) -> StorageResult<()> {
        self.ledgers
            .write()
            .await
            .insert(ledger_key(address), ledger.clone());
        Ok(())
    }

    async fn exists(&self, address: &str) -> StorageResult<bool> {
        Ok(self.ledgers.read().await.contains_key(&ledger_key(address)))
    }

    async fn lock(&self, address: &str) -> DocumentGuard {
        self.locks.acquire(&ledger_key(address)).await
    }
}

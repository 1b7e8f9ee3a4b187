//! Account Pool Allocator
//!
//! Hands out pre-provisioned addresses to registering users. The first
//! available entry in stored order wins; the whole pool document is
//! rewritten with that entry flipped to assigned.
//!
//! Allocation holds the pool guard from load to save, so concurrent
//! callers in one process never receive the same address.

use std::sync::Arc;
use tracing::warn;

use super::session::Session;
use crate::common::error::{CustodyError, Result};
use crate::common::logging::{pool_event, security_event};
use crate::storage::{LedgerStore, PoolStore};

/// A freshly assigned address and its recovery phrase
#[derive(Clone, PartialEq, Eq)]
pub struct Allocation {
    pub address: String,
    pub mnemonic: String,
}

impl std::fmt::Debug for Allocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Allocation")
            .field("address", &self.address)
            .field("mnemonic", &"<redacted>")
            .finish()
    }
}

/// Pool allocator and login
pub struct PoolAllocator {
    pool: Arc<dyn PoolStore>,
    ledgers: Arc<dyn LedgerStore>,
}

impl PoolAllocator {
    pub fn new(pool: Arc<dyn PoolStore>, ledgers: Arc<dyn LedgerStore>) -> Self {
        Self { pool, ledgers }
    }

    /// Assign the first available address
    ///
    /// An empty ledger is created for the address (if it has none) before
    /// the pool is persisted, so every assigned address is reconcilable.
    pub async fn allocate(&self) -> Result<Allocation> {
        let _guard = self.pool.lock().await;

        let mut doc = self.pool.load().await?;
        let entry = match doc.assign_first_available() {
            Some(entry) => entry.clone(),
            None => {
                warn!(target: "custody::pool", accounts = doc.accounts.len(), "Pool exhausted");
                return Err(CustodyError::Exhausted);
            }
        };

        self.ledgers.init(&entry.address).await?;
        self.pool.save(&doc).await?;

        pool_event(&entry.address, doc.available_count()).emit();

        Ok(Allocation {
            address: entry.address,
            mnemonic: entry.mnemonic,
        })
    }

    /// Open a user session from a recovery phrase
    pub async fn login(&self, mnemonic: &str) -> Result<Session> {
        let doc = self.pool.load().await?;

        match doc.find_assigned_by_mnemonic(mnemonic) {
            Some(entry) => {
                security_event("user_login", true, serde_json::json!({ "address": entry.address }))
                    .emit();
                Ok(Session::user(&entry.address))
            }
            None => {
                security_event("user_login", false, serde_json::json!({})).emit();
                Err(CustodyError::NotFound("no account for this mnemonic".to_string()))
            }
        }
    }

    /// Assigned addresses in stored order
    pub async fn assigned_addresses(&self) -> Result<Vec<String>> {
        Ok(self.pool.load().await?.assigned_addresses())
    }
}

//! Read-only chain inspection for operators
//!
//! Looks up balances, blocks and single transactions without touching
//! any ledger.

use std::sync::Arc;
use tracing::debug;

use super::client::{ChainClient, ChainError, TransactionLookup, TransactionReceipt};
use crate::types::Amount;

/// Where a transaction stands on chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Pending,
    Succeeded,
    Failed,
    /// Included, but the node has no receipt for it
    Unknown,
}

impl std::fmt::Display for TxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TxState::Pending => "pending",
            TxState::Succeeded => "success",
            TxState::Failed => "failed",
            TxState::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// A transaction and, once included, its receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionDetail {
    pub lookup: TransactionLookup,
    pub receipt: Option<TransactionReceipt>,
}

impl TransactionDetail {
    pub fn state(&self) -> TxState {
        if self.lookup.is_pending {
            return TxState::Pending;
        }
        match &self.receipt {
            Some(r) if r.success => TxState::Succeeded,
            Some(_) => TxState::Failed,
            None => TxState::Unknown,
        }
    }
}

/// Every transaction in one block, in block order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockReport {
    pub number: u64,
    pub hash: String,
    pub transactions: Vec<TransactionDetail>,
}

pub struct ChainInspector {
    chain: Arc<dyn ChainClient>,
}

impl ChainInspector {
    pub fn new(chain: Arc<dyn ChainClient>) -> Self {
        Self { chain }
    }

    /// Balance currently held at `address`
    pub async fn balance(&self, address: &str) -> Result<Amount, ChainError> {
        self.chain.balance_at(&address.to_lowercase()).await
    }

    /// Look a transaction up; the receipt is fetched only once it is included
    pub async fn transaction(&self, hash: &str) -> Result<TransactionDetail, ChainError> {
        let lookup = self.chain.transaction_by_hash(hash).await?;
        let receipt = if lookup.is_pending {
            None
        } else {
            self.chain.transaction_receipt(hash).await?
        };

        Ok(TransactionDetail { lookup, receipt })
    }

    /// Block `number` with the detail of each of its transactions
    pub async fn block(&self, number: u64) -> Result<BlockReport, ChainError> {
        let block = self.chain.block_by_number(number).await?;

        let mut transactions = Vec::with_capacity(block.transactions.len());
        for hash in &block.transactions {
            transactions.push(self.transaction(hash).await?);
        }

        debug!(
            target: "custody::chain",
            block = number,
            transactions = transactions.len(),
            "Inspected block"
        );

        Ok(BlockReport {
            number: block.number,
            hash: block.hash,
            transactions,
        })
    }
}

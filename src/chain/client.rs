//! Chain Client Interface
//!
//! Everything the engine asks of the chain. All calls are remote and may
//! stall; callers surface failures instead of retrying.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Amount;

/// Chain client errors
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Transaction not found: {0}")]
    TxNotFound(String),

    #[error("Block not found: {0}")]
    BlockNotFound(u64),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Broadcast failed: {0}")]
    BroadcastFailed(String),
}

/// Result of looking a transaction up by hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionLookup {
    pub hash: String,
    /// Not yet included in a block
    pub is_pending: bool,
    pub block_number: Option<u64>,
    pub from: String,
    pub to: Option<String>,
    pub value: Amount,
}

/// Execution outcome of an included transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub hash: String,
    pub block_number: Option<u64>,
    /// Execution succeeded
    pub success: bool,
}

/// Block header plus transaction hashes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSummary {
    pub number: u64,
    pub hash: String,
    pub transactions: Vec<String>,
}

/// Chain query and broadcast interface
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Current balance held at `address`
    async fn balance_at(&self, address: &str) -> Result<Amount, ChainError>;

    /// Block with transaction hashes
    async fn block_by_number(&self, number: u64) -> Result<BlockSummary, ChainError>;

    /// Transaction with its pending flag; unknown hashes are `TxNotFound`
    async fn transaction_by_hash(&self, hash: &str) -> Result<TransactionLookup, ChainError>;

    /// Receipt, `None` while the transaction is pending
    async fn transaction_receipt(
        &self,
        hash: &str,
    ) -> Result<Option<TransactionReceipt>, ChainError>;

    /// Network-suggested gas price in wei
    async fn suggest_gas_price(&self) -> Result<Amount, ChainError>;

    /// Next nonce for `address`, counting pending transactions
    async fn pending_nonce_at(&self, address: &str) -> Result<u64, ChainError>;

    /// Network id used for replay protection
    async fn network_id(&self) -> Result<u64, ChainError>;

    /// Broadcast a signed transaction (0x-prefixed RLP); returns its hash
    async fn send_raw_transaction(&self, raw_tx: &str) -> Result<String, ChainError>;
}

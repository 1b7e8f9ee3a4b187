//! Shared Types Module
//!
//! Amounts, pool and ledger types shared across the custody engine.

pub mod amount;
pub mod ledger;
pub mod pool;

// Re-exports for convenience
pub use amount::{wei_to_display, wei_to_ether_string, Amount, AmountError, WEI_PER_ETHER};
pub use ledger::{
    Ledger, LedgerDocument, TransactionDocument, TransactionRecord, TxStatus, TxType,
};
pub use pool::{AccountStatus, PoolDocument, PoolEntry};

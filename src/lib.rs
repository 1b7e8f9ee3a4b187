//! Ledger Custody - Custodial front-end for an Ethereum-style chain
//!
//! Users receive addresses from a pre-provisioned pool. Every transfer
//! touching a user is recorded as pending in that user's ledger and
//! folded into the balances once the chain confirms it. Operators sweep
//! funds resting at user addresses into a single treasury address.
//!
//! ## Components
//!
//! 1. **Pool Allocator** - exclusive address assignment and login
//! 2. **Ledger Reconciliation** - confirms pending records against the chain
//! 3. **Transaction Submission** - signs, broadcasts and records transfers
//! 4. **Centralization Sweep** - moves user-address funds to the treasury
//!
//! Private keys never enter this crate; signing goes through
//! `TransferSigner` implementations.

pub mod chain;
pub mod common;
pub mod ledger;
pub mod pool;
pub mod service;
pub mod storage;
pub mod sweep;
pub mod transfer;
pub mod types;

// Re-exports: infrastructure
pub use common::{CustodyConfig, CustodyError, Network, Result};

// Re-exports: chain collaborators
pub use chain::{ChainClient, ChainError, EthRpcClient, KeyResolver, NodeKeyring, TransferSigner};

// Re-exports: engine
pub use ledger::{ReconcileOutcome, Reconciler};
pub use pool::{Allocation, PoolAllocator, Session};
pub use service::CustodyService;
pub use sweep::{Centralizer, SweepReport};
pub use transfer::TransferSubmitter;
pub use types::{Amount, Ledger, TxStatus, TxType};

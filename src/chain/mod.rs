//! Chain Collaborators
//!
//! - **client**: `ChainClient` trait and its result types
//! - **inspector**: read-only balance, block and transaction lookups
//! - **rpc**: JSON-RPC implementation over HTTP
//! - **signer**: `TransferSigner` / `KeyResolver` traits and node-keystore signing

pub mod client;
pub mod inspector;
pub mod rpc;
pub mod signer;

#[cfg(test)]
pub mod testing;

// Re-exports
pub use client::{BlockSummary, ChainClient, ChainError, TransactionLookup, TransactionReceipt};
pub use inspector::{BlockReport, ChainInspector, TransactionDetail, TxState};
pub use rpc::EthRpcClient;
pub use signer::{
    KeyResolver, NodeKeyring, NodeSigner, SignedTransfer, SignerError, TransferSigner,
    UnsignedTransfer,
};

//! Storage Layer Module
//!
//! Provides persistence for the address pool and per-address ledgers.
//!
//! This module contains:
//! - Storage trait definitions for abstraction
//! - JSON file implementation for production
//! - In-memory implementation for testing

pub mod file;
pub mod memory;
pub mod traits;

// Re-exports for convenience
pub use file::{FileLedgerStore, FilePoolStore};
pub use memory::{MemoryLedgerStore, MemoryPoolStore};
pub use traits::{
    ledger_key, DocumentGuard, DocumentLocks, LedgerStore, PoolStore, StorageError,
    StorageResult,
};

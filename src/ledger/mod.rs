//! Ledger Reconciliation Module
//!
//! Folds chain confirmations into per-address ledgers.

pub mod reconciler;

// Re-exports
pub use reconciler::{apply_finality, Finality, FoldSummary, ReconcileOutcome, Reconciler};

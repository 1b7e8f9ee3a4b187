//! Transaction Submission Module
//!
//! Signs and broadcasts transfers, and records their hashes as pending.

pub mod submitter;

// Re-exports
pub use submitter::TransferSubmitter;

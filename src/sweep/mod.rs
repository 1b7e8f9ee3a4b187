//! Centralization Sweep Module
//!
//! Collects funds from user addresses into the treasury.

pub mod centralizer;

// Re-exports
pub use centralizer::{Centralizer, SweepEntry, SweepReport};

//! Address Pool Module
//!
//! - **allocator**: assigns available addresses and logs users in
//! - **session**: explicit identity passed into ledger operations

pub mod allocator;
pub mod session;

// Re-exports
pub use allocator::{Allocation, PoolAllocator};
pub use session::{Role, Session};

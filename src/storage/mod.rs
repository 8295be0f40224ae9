//! Data storage and persistence
//!
//! The sled-backed store for blocks and wallets, and the in-memory pool of
//! transactions waiting to be mined.

pub mod memory_pool;
pub mod store;

pub use memory_pool::PendingPool;
pub use store::Store;

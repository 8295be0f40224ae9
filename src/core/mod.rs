//! Core blockchain functionality
//!
//! Transactions, blocks, proof-of-work sealing and the chain that strings
//! them together.

pub mod block;
pub mod blockchain;
pub mod proof_of_work;
pub mod transaction;

pub use block::Block;
pub use blockchain::{validate_blocks, Blockchain, SharedChain};
pub use proof_of_work::{leading_zero_bits, ProofOfWork, TARGET_BITS};
pub use transaction::{Transaction, COINBASE_SENDER, GENESIS_ADDRESS};

/// Reward paid to the miner of each block
pub const BLOCK_REWARD: i64 = 50;

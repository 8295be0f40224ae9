//! # chaingo - a minimal proof-of-work ledger with P2P gossip
//!
//! Mines blocks, signs and verifies value transfers, links blocks into a
//! hash chain, persists them, and gossips new blocks and transactions to
//! other nodes over a one-message-per-connection binary protocol.
//!
//! ## Layout
//! - `core/`: transactions, blocks, proof of work and the chain itself
//! - `wallet/`: P-256 keypairs, addresses and the persisted wallet registry
//! - `network/`: wire codec, peer set and the node
//! - `storage/`: sled-backed store and the pending transaction pool
//! - `service/`: the `Ledger` application state the CLI drives
//! - `config/`: layered node settings
//! - `utils/`: hashing, signing and binary encoding helpers
//! - `cli/`: command-line parsing
//!
//! ## Things to keep in mind
//! - Validation checks hash links and each block's nonce against the target;
//!   the stored `hash` field itself is not recomputed.
//! - A received chain is reported, never merged. `Blockchain::adopt_chain`
//!   exists for callers that want longest-chain replacement.
//! - Broadcast prunes a peer the first time a connection to it fails.

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod network;
pub mod service;
pub mod storage;
pub mod utils;
pub mod wallet;

#[cfg(test)]
pub mod testnet;

// Re-export commonly used types for convenience
pub use cli::{Command, Opt};
pub use config::Config;
pub use core::{
    validate_blocks, Block, Blockchain, ProofOfWork, SharedChain, Transaction, BLOCK_REWARD,
    COINBASE_SENDER, GENESIS_ADDRESS, TARGET_BITS,
};
pub use error::{BlockchainError, IntegrityFault, Result};
pub use network::{
    decode_message, encode_message, send_message, BroadcastReport, Message, Node, NodeEvent,
    NodeOptions, PeerManager,
};
pub use service::{ChainStats, Ledger};
pub use storage::{PendingPool, Store};
pub use utils::{current_timestamp, sha256_digest};
pub use wallet::{address_of, Wallet, Wallets};

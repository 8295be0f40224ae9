//! Wallet management and cryptographic operations
//!
//! P-256 keypairs, hex-digest addresses and the persisted registry of every
//! wallet this node has created.

#[allow(clippy::module_inception)]
pub mod wallet;
pub mod wallets;

pub use wallet::{address_of, Wallet};
pub use wallets::Wallets;

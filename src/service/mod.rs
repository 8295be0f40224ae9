//! Application state
//!
//! The operations the CLI (or any other front end) drives: wallets,
//! transfers, mining, chain queries and peer management.

pub mod ledger;

pub use ledger::{ChainStats, Ledger};

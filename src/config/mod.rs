//! Configuration management
//!
//! Node address, database location, wire limits and the block reward.

pub mod settings;

pub use settings::Config;

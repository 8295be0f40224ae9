//! Command-line interface
//!
//! Argument parsing for the `chaingo` binary.

pub mod commands;

pub use commands::{Command, Opt};

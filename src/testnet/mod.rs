//! Test helpers: throwaway stores, pre-mined chains and loopback addresses.

pub mod test_utils;

pub use test_utils::*;

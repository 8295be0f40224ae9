//! Test utilities shared by the unit tests

use crate::core::{Blockchain, Transaction};
use crate::service::Ledger;
use crate::storage::Store;
use std::net::TcpListener;

/// A chain holding only a freshly mined genesis block, on a temporary store
pub fn create_test_chain() -> Blockchain {
    Blockchain::open(Store::temporary().unwrap()).unwrap()
}

/// A chain with `len` blocks in total, genesis included
pub fn chain_with_blocks(len: usize) -> Blockchain {
    let mut chain = create_test_chain();
    for i in 1..len {
        let tx = Transaction::new("tester", &format!("recipient-{i}"), i as i64);
        chain.append(vec![tx]).unwrap();
    }
    chain
}

pub fn create_test_ledger() -> Ledger {
    Ledger::open(Store::temporary().unwrap(), crate::core::BLOCK_REWARD).unwrap()
}

/// A loopback address nothing is listening on
pub fn unreachable_addr() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);
    addr
}

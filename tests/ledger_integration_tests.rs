//! Ledger integration tests
//!
//! Drives the public API end to end: on-disk persistence, wallet reloads,
//! gossip between two live nodes and the chain-sync exchange.

use chaingo::{
    Block, BlockchainError, IntegrityFault, Ledger, NodeEvent, NodeOptions, Store, Transaction,
    BLOCK_REWARD,
};
use std::net::TcpListener;
use std::sync::mpsc::Receiver;
use std::time::Duration;
use tempfile::tempdir;

const WAIT: Duration = Duration::from_secs(10);

fn ledger_at(path: &std::path::Path) -> Ledger {
    Ledger::open(Store::open(path).unwrap(), BLOCK_REWARD).unwrap()
}

fn running_ledger() -> Ledger {
    let mut ledger = Ledger::open(Store::temporary().unwrap(), BLOCK_REWARD).unwrap();
    ledger
        .start_node("127.0.0.1:0", NodeOptions::default())
        .unwrap();
    ledger
}

fn node_addr(ledger: &Ledger) -> String {
    ledger.node().unwrap().addr().to_string()
}

fn events(ledger: &Ledger) -> Receiver<NodeEvent> {
    ledger.node().unwrap().subscribe().unwrap()
}

// Handlers run on their own threads, so skip whatever else shows up first
fn wait_for<T>(inbox: &Receiver<NodeEvent>, mut pick: impl FnMut(NodeEvent) -> Option<T>) -> T {
    loop {
        if let Some(found) = pick(inbox.recv_timeout(WAIT).unwrap()) {
            return found;
        }
    }
}

#[test]
fn test_chain_reloads_in_mining_order() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("chain.db");

    let mined: Vec<Block> = {
        let ledger = ledger_at(&db_path);
        for i in 0..3 {
            ledger.mine_block(Some(&format!("miner-{i}"))).unwrap();
        }
        ledger.get_chain().unwrap()
    };
    assert_eq!(mined.len(), 4);

    let reopened = ledger_at(&db_path);
    assert_eq!(reopened.get_chain().unwrap(), mined);
    assert!(reopened.validate_chain().is_ok());
    assert_eq!(
        reopened.wallet_balance("miner-1").unwrap(),
        i128::from(BLOCK_REWARD)
    );
}

#[test]
fn test_truncation_survives_restart() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("chain.db");

    {
        let ledger = ledger_at(&db_path);
        ledger.mine_block(None).unwrap();
        ledger.mine_block(None).unwrap();
        assert_eq!(ledger.delete_blocks_from(2).unwrap(), 1);
    }

    let reopened = ledger_at(&db_path);
    assert_eq!(reopened.get_chain().unwrap().len(), 2);
    reopened.mine_block(None).unwrap();
    assert!(reopened.validate_chain().is_ok());
}

#[test]
fn test_wallets_sign_after_restart() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("chain.db");

    let (address, private_key) = {
        let ledger = ledger_at(&db_path);
        let wallet = ledger.create_wallet().unwrap();
        (wallet.address(), wallet.private_key_hex())
    };

    let reopened = ledger_at(&db_path);
    assert_eq!(reopened.addresses().unwrap(), vec![address.clone()]);
    let tx = reopened
        .create_and_sign_transaction(&address, "bob", 5, &private_key)
        .unwrap();
    assert!(tx.verify());
}

#[test]
fn test_foreign_block_breaks_validation_at_its_index() {
    let temp_dir = tempdir().unwrap();
    let db_path = temp_dir.path().join("chain.db");
    let store = Store::open(&db_path).unwrap();

    let ledger = Ledger::open(store.clone(), BLOCK_REWARD).unwrap();
    ledger.mine_block(None).unwrap();
    let tip = ledger.get_latest_block().unwrap();
    drop(ledger);

    // Mined on top of a hash this chain never had
    let stranger = Block::new_block(vec![Transaction::new("A", "B", 1)], vec![9u8; 32]).unwrap();
    store.put_block(2, &stranger).unwrap();
    let child = Block::new_block(vec![], stranger.get_hash().to_vec()).unwrap();
    store.put_block(3, &child).unwrap();
    assert_ne!(stranger.get_prev_hash(), tip.get_hash());

    let reopened = Ledger::open(store, BLOCK_REWARD).unwrap();
    match reopened.validate_chain() {
        Err(BlockchainError::ChainIntegrity { index, fault }) => {
            assert_eq!(index, 2);
            assert_eq!(fault, IntegrityFault::PrevHashMismatch);
        }
        other => panic!("expected an integrity failure, got {other:?}"),
    }
}

#[test]
fn test_mined_block_and_transaction_reach_peer() {
    let sender = running_ledger();
    let receiver = running_ledger();
    let inbox = events(&receiver);
    sender.add_peer(&node_addr(&receiver)).unwrap();

    let wallet = sender.create_wallet().unwrap();
    let tx = sender
        .create_and_sign_transaction(&wallet.address(), "bob", 7, &wallet.private_key_hex())
        .unwrap();
    let received = wait_for(&inbox, |event| match event {
        NodeEvent::TransactionReceived { transaction, .. } => Some(transaction),
        _ => None,
    });
    assert_eq!(received, tx);
    assert!(received.verify());

    let block = sender.mine_block(Some(&wallet.address())).unwrap();
    let received = wait_for(&inbox, |event| match event {
        NodeEvent::BlockReceived { block, .. } => Some(block),
        _ => None,
    });
    assert_eq!(received, block);

    // Gossip is reported, never applied
    assert_eq!(receiver.get_chain().unwrap().len(), 1);
    assert!(receiver.list_pending_transactions().is_empty());
}

#[test]
fn test_unreachable_peer_is_pruned_on_mine() {
    let ledger = running_ledger();
    let live = TcpListener::bind("127.0.0.1:0").unwrap();
    let dead = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().to_string()
    };
    let live_addr = live.local_addr().unwrap().to_string();
    ledger.add_peer(&live_addr).unwrap();
    ledger.add_peer(&dead).unwrap();

    ledger.mine_block(None).unwrap();

    assert_eq!(ledger.list_peers().unwrap(), vec![live_addr]);
    assert_eq!(ledger.chain_stats().unwrap().peers, 1);
}

#[test]
fn test_sync_reports_remote_chain_and_adoption_is_explicit() {
    let longer = running_ledger();
    longer.mine_block(None).unwrap();
    longer.mine_block(None).unwrap();

    let shorter = running_ledger();
    let inbox = events(&shorter);
    shorter.add_peer(&node_addr(&longer)).unwrap();

    let report = shorter.request_sync().unwrap();
    assert_eq!(report.delivered, vec![node_addr(&longer)]);

    let remote = wait_for(&inbox, |event| match event {
        NodeEvent::ChainReceived { blocks, .. } => Some(blocks),
        _ => None,
    });
    assert_eq!(remote, longer.get_chain().unwrap());
    assert_eq!(shorter.get_chain().unwrap().len(), 1);

    let adopted = shorter.chain().write().unwrap().adopt_chain(remote).unwrap();
    assert!(adopted);
    assert_eq!(shorter.get_chain().unwrap(), longer.get_chain().unwrap());
    assert!(shorter.validate_chain().is_ok());
}

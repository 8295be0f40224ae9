use crate::core::{ProofOfWork, Transaction, GENESIS_ADDRESS};
use crate::error::Result;
use crate::utils::{current_timestamp, deserialize, serialize, sha256_digest};
use data_encoding::HEXLOWER;
use log::info;
use serde::{Deserialize, Serialize};

/// A sealed block. There is no unsealed state: every constructor mines
/// before returning.
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, bincode::Encode, bincode::Decode,
)]
pub struct Block {
    timestamp: i64,
    transactions: Vec<Transaction>,
    prev_hash: Vec<u8>,
    hash: Vec<u8>,
    nonce: i64,
}

impl Block {
    /// Stamps the block with the current time and mines it on top of `prev_hash`.
    pub fn new_block(transactions: Vec<Transaction>, prev_hash: Vec<u8>) -> Result<Block> {
        Ok(Self::with_timestamp(
            current_timestamp()?,
            transactions,
            prev_hash,
        ))
    }

    /// Mines a block with a caller-chosen timestamp. Same inputs, same seal.
    pub fn with_timestamp(
        timestamp: i64,
        transactions: Vec<Transaction>,
        prev_hash: Vec<u8>,
    ) -> Block {
        let mut block = Block {
            timestamp,
            transactions,
            prev_hash,
            hash: Vec::new(),
            nonce: 0,
        };

        let (hash, nonce) = ProofOfWork::new_proof_of_work(&block).run();
        block.hash = hash;
        block.nonce = nonce;
        block
    }

    /// Genesis: empty previous hash and a single zero-value placeholder transfer.
    pub fn genesis() -> Result<Block> {
        info!("Mining genesis block");
        let placeholder = Transaction::new(GENESIS_ADDRESS, GENESIS_ADDRESS, 0);
        Block::new_block(vec![placeholder], Vec::new())
    }

    pub fn is_genesis(&self) -> bool {
        self.prev_hash.is_empty()
    }

    /// SHA-256 over the concatenated transaction hashes, in block order
    pub fn hash_transactions(&self) -> Vec<u8> {
        let mut tx_hashes = Vec::with_capacity(self.transactions.len() * 32);
        for transaction in &self.transactions {
            tx_hashes.extend(transaction.hash());
        }
        sha256_digest(&tx_hashes)
    }

    pub fn get_timestamp(&self) -> i64 {
        self.timestamp
    }

    pub fn get_transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    pub fn get_prev_hash(&self) -> &[u8] {
        self.prev_hash.as_slice()
    }

    pub fn get_hash(&self) -> &[u8] {
        self.hash.as_slice()
    }

    pub fn get_nonce(&self) -> i64 {
        self.nonce
    }

    pub fn hash_hex(&self) -> String {
        HEXLOWER.encode(&self.hash)
    }

    pub fn prev_hash_hex(&self) -> String {
        HEXLOWER.encode(&self.prev_hash)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Block> {
        deserialize(bytes)
    }

    #[cfg(test)]
    pub(crate) fn set_prev_hash_for_test(&mut self, prev_hash: Vec<u8>) {
        self.prev_hash = prev_hash;
    }

    #[cfg(test)]
    pub(crate) fn set_hash_for_test(&mut self, hash: Vec<u8>) {
        self.hash = hash;
    }

    #[cfg(test)]
    pub(crate) fn set_nonce_for_test(&mut self, nonce: i64) {
        self.nonce = nonce;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TARGET_BITS;
    use crate::wallet::Wallet;
    use num_bigint::BigUint;

    #[test]
    fn test_genesis_is_mined_below_target() {
        let genesis = Block::genesis().unwrap();

        assert!(genesis.is_genesis());
        assert_eq!(genesis.get_transactions().len(), 1);
        assert_eq!(genesis.get_transactions()[0].get_from(), "Genesis");
        assert_eq!(genesis.get_transactions()[0].get_to(), "Genesis");
        assert_eq!(genesis.get_transactions()[0].get_amount(), 0);

        let hash_int = BigUint::from_bytes_be(genesis.get_hash());
        assert!(hash_int < BigUint::from(1u8) << (256 - TARGET_BITS));
        assert!(ProofOfWork::validate(&genesis));
    }

    #[test]
    fn test_child_links_to_parent_hash() {
        let genesis = Block::genesis().unwrap();
        let child = Block::new_block(
            vec![Transaction::new("A", "B", 10)],
            genesis.get_hash().to_vec(),
        )
        .unwrap();

        assert_eq!(child.get_prev_hash(), genesis.get_hash());
        assert!(!child.is_genesis());
        assert!(ProofOfWork::validate(&child));
    }

    #[test]
    fn test_transaction_order_changes_digest() {
        let a = Transaction::new("A", "B", 1);
        let b = Transaction::new("B", "C", 2);
        let forward = Block::with_timestamp(100, vec![a.clone(), b.clone()], vec![9]);
        let backward = Block::with_timestamp(100, vec![b, a], vec![9]);

        assert_ne!(forward.hash_transactions(), backward.hash_transactions());
    }

    #[test]
    fn test_serialization_round_trip() {
        let wallet = Wallet::generate().unwrap();
        let mut tx = Transaction::new(&wallet.address(), "B", 10);
        tx.sign(&wallet).unwrap();
        let block = Block::with_timestamp(
            1_700_000_000,
            vec![Transaction::new_coinbase("miner", 50), tx],
            vec![0xAA; 32],
        );

        let restored = Block::deserialize(&block.serialize().unwrap()).unwrap();
        assert_eq!(restored, block);
        assert_eq!(restored.get_nonce(), block.get_nonce());
        assert!(restored.get_transactions()[1].verify());
    }

    #[test]
    fn test_hex_views() {
        let block = Block::with_timestamp(5, vec![Transaction::new("A", "B", 1)], vec![0x0f, 0xa0]);
        assert_eq!(block.prev_hash_hex(), "0fa0");
        assert_eq!(block.hash_hex().len(), 64);
    }
}

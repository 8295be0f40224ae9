// This is the chain itself - an ordered list of sealed blocks with genesis at index 0
// I keep the whole sequence in memory and write every new block through to the store
// Nothing here ever repairs a broken chain; validation only reports where it broke

use crate::core::{Block, ProofOfWork, Transaction};
use crate::error::{BlockchainError, IntegrityFault, Result};
use crate::storage::Store;
use log::{info, warn};
use std::sync::{Arc, RwLock};

/// The chain as shared between the service layer and the network node.
/// One coarse lock guards the whole sequence.
pub type SharedChain = Arc<RwLock<Blockchain>>;

pub struct Blockchain {
    blocks: Vec<Block>,
    store: Store,
}

impl Blockchain {
    // When I open a chain, I first try the store; if that yields nothing usable
    // I mine a fresh genesis block and persist it
    pub fn open(store: Store) -> Result<Blockchain> {
        let blocks = match Self::reload(&store) {
            Ok(blocks) if !blocks.is_empty() => {
                info!("Loaded existing chain with {} blocks", blocks.len());
                blocks
            }
            Ok(_) => {
                info!("No existing chain found, creating genesis block");
                Vec::new()
            }
            Err(e) => {
                warn!("Error loading chain, creating genesis block: {e}");
                Vec::new()
            }
        };

        let mut chain = Blockchain { blocks, store };
        if chain.blocks.is_empty() {
            // Index entries left over from a failed reload would break the next restart too
            let dropped = chain.store.remove_blocks_from(0)?;
            if dropped > 0 {
                warn!("Dropped {dropped} stale chain index entries before re-creating genesis");
            }
            let genesis = Block::genesis()?;
            chain.persist(0, &genesis)?;
            chain.blocks.push(genesis);
        }
        Ok(chain)
    }

    pub fn into_shared(self) -> SharedChain {
        Arc::new(RwLock::new(self))
    }

    /// Rebuilds the sequence from the store, in mining order.
    pub fn reload(store: &Store) -> Result<Vec<Block>> {
        store.load_blocks()
    }

    /// Writes `block` keyed by its hash and records it at `height`.
    pub fn persist(&self, height: usize, block: &Block) -> Result<()> {
        self.store.put_block(height, block)
    }

    // Mining happens first; the block only joins the in-memory chain once it is durable
    pub fn append(&mut self, transactions: Vec<Transaction>) -> Result<&Block> {
        let height = self.blocks.len();
        let block = Block::new_block(transactions, self.tip().get_hash().to_vec())?;
        self.persist(height, &block)?;
        info!(
            "Appended block {} at height {height} with {} transactions",
            block.hash_hex(),
            block.get_transactions().len()
        );
        self.blocks.push(block);
        Ok(self.tip())
    }

    /// Reports the first linkage or proof-of-work violation, if any.
    pub fn validate(&self) -> Result<()> {
        validate_blocks(&self.blocks)
    }

    /// Drops the block at `index` and everything after it, in memory and in
    /// the store. Genesis cannot be removed.
    pub fn delete_blocks_from(&mut self, index: usize) -> Result<usize> {
        if index == 0 {
            return Err(BlockchainError::InvalidBlock(
                "Cannot delete genesis block".to_string(),
            ));
        }
        if index >= self.blocks.len() {
            return Err(BlockchainError::BlockNotFound(index));
        }

        self.store.remove_blocks_from(index)?;
        let deleted = self.blocks.len() - index;
        self.blocks.truncate(index);
        info!("Deleted {deleted} blocks starting from index {index}");
        Ok(deleted)
    }

    /// Replaces the local chain with `candidate` when it is strictly longer,
    /// starts at a genesis block and validates. Returns whether it was adopted.
    /// The node never calls this; received chains are only reported.
    pub fn adopt_chain(&mut self, candidate: Vec<Block>) -> Result<bool> {
        if candidate.len() <= self.blocks.len() {
            return Ok(false);
        }
        if !candidate.first().is_some_and(Block::is_genesis) {
            return Ok(false);
        }
        if let Err(e) = validate_blocks(&candidate) {
            warn!("Rejected candidate chain: {e}");
            return Ok(false);
        }

        self.store.replace_chain(&candidate)?;
        info!(
            "Adopted candidate chain: {} -> {} blocks",
            self.blocks.len(),
            candidate.len()
        );
        self.blocks = candidate;
        Ok(true)
    }

    pub fn blocks(&self) -> &[Block] {
        self.blocks.as_slice()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn tip(&self) -> &Block {
        // open() guarantees genesis, and nothing can remove it
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn get_block(&self, index: usize) -> Result<&Block> {
        self.blocks
            .get(index)
            .ok_or(BlockchainError::BlockNotFound(index))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    // Balance is a straight scan: credits to the address minus debits from it
    // Amounts are unchecked i64s, so the sum is widened to stay exact
    pub fn balance_of(&self, address: &str) -> i128 {
        let mut balance: i128 = 0;
        for tx in self.blocks.iter().flat_map(|b| b.get_transactions()) {
            let amount = i128::from(tx.get_amount());
            if tx.get_to() == address {
                balance += amount;
            }
            if tx.get_from() == address {
                balance -= amount;
            }
        }
        balance
    }

    /// Finds a transaction by its hex hash, together with the block holding it
    pub fn find_transaction(&self, hash_hex: &str) -> Option<(&Block, &Transaction)> {
        self.blocks.iter().find_map(|block| {
            block
                .get_transactions()
                .iter()
                .find(|tx| tx.hash_hex() == hash_hex)
                .map(|tx| (block, tx))
        })
    }

    pub fn total_transactions(&self) -> usize {
        self.blocks.iter().map(|b| b.get_transactions().len()).sum()
    }
}

/// Walks `blocks` from index 1 and returns the first broken link or failed
/// proof of work. Stored hashes are taken at face value.
pub fn validate_blocks(blocks: &[Block]) -> Result<()> {
    for (offset, pair) in blocks.windows(2).enumerate() {
        let index = offset + 1;
        let (prev, curr) = (&pair[0], &pair[1]);

        if curr.get_prev_hash() != prev.get_hash() {
            return Err(BlockchainError::ChainIntegrity {
                index,
                fault: IntegrityFault::PrevHashMismatch,
            });
        }
        if !ProofOfWork::validate(curr) {
            return Err(BlockchainError::ChainIntegrity {
                index,
                fault: IntegrityFault::ProofOfWorkInvalid,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testnet::{chain_with_blocks, create_test_chain};

    #[test]
    fn test_open_creates_and_persists_genesis() {
        let chain = create_test_chain();
        assert_eq!(chain.len(), 1);
        assert!(chain.tip().is_genesis());
        assert_eq!(chain.store().load_blocks().unwrap(), chain.blocks().to_vec());
    }

    #[test]
    fn test_append_links_to_genesis() {
        let mut chain = create_test_chain();
        let genesis_hash = chain.tip().get_hash().to_vec();

        let block = chain.append(vec![Transaction::new("A", "B", 10)]).unwrap();
        assert_eq!(block.get_prev_hash(), genesis_hash.as_slice());
        assert_eq!(chain.len(), 2);
        assert!(chain.validate().is_ok());
    }

    #[test]
    fn test_reopen_restores_mining_order() {
        let chain = chain_with_blocks(4);
        let expected = chain.blocks().to_vec();
        let store = chain.store().clone();
        drop(chain);

        let reopened = Blockchain::open(store).unwrap();
        assert_eq!(reopened.blocks(), expected.as_slice());
        assert!(reopened.validate().is_ok());
    }

    #[test]
    fn test_validate_reports_broken_link_index() {
        let mut chain = chain_with_blocks(4);
        chain.blocks[2].set_prev_hash_for_test(vec![0u8; 32]);

        match chain.validate() {
            Err(BlockchainError::ChainIntegrity { index, fault }) => {
                assert_eq!(index, 2);
                assert_eq!(fault, IntegrityFault::PrevHashMismatch);
            }
            other => panic!("expected integrity failure, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_reports_first_violation_only() {
        let mut chain = chain_with_blocks(4);
        chain.blocks[3].set_prev_hash_for_test(vec![1u8; 32]);
        chain.blocks[1].set_prev_hash_for_test(vec![2u8; 32]);

        assert!(matches!(
            chain.validate(),
            Err(BlockchainError::ChainIntegrity { index: 1, .. })
        ));
    }

    #[test]
    fn test_validate_ignores_genesis_linkage() {
        let mut chain = chain_with_blocks(1);
        chain.blocks[0].set_prev_hash_for_test(vec![7u8; 4]);
        assert!(chain.validate().is_ok());
    }

    #[test]
    fn test_balance_scan() {
        let mut chain = create_test_chain();
        chain
            .append(vec![
                Transaction::new_coinbase("alice", 50),
                Transaction::new("alice", "bob", 20),
            ])
            .unwrap();
        chain.append(vec![Transaction::new("bob", "alice", 5)]).unwrap();

        assert_eq!(chain.balance_of("alice"), 35);
        assert_eq!(chain.balance_of("bob"), 15);
        assert_eq!(chain.balance_of("carol"), 0);
        assert_eq!(chain.total_transactions(), 4);
    }

    #[test]
    fn test_balance_beyond_i64_range() {
        let mut chain = create_test_chain();
        chain
            .append(vec![
                Transaction::new("x", "bob", i64::MAX),
                Transaction::new("y", "bob", 1),
            ])
            .unwrap();
        chain
            .append(vec![
                Transaction::new("bob", "z", i64::MAX),
                Transaction::new("bob", "z", i64::MAX),
                Transaction::new("bob", "z", i64::MAX),
            ])
            .unwrap();

        assert_eq!(chain.balance_of("z"), 3 * i128::from(i64::MAX));
        assert_eq!(chain.balance_of("bob"), 1 - 2 * i128::from(i64::MAX));
        assert_eq!(chain.balance_of("x"), -i128::from(i64::MAX));
    }

    #[test]
    fn test_reopen_after_damaged_index_keeps_new_blocks() {
        let chain = chain_with_blocks(3);
        let store = chain.store().clone();
        let lost = chain.blocks()[2].get_hash().to_vec();
        drop(chain);
        store.remove_block_record(&lost).unwrap();

        let mut reopened = Blockchain::open(store.clone()).unwrap();
        assert_eq!(reopened.len(), 1);
        let appended = reopened
            .append(vec![Transaction::new("A", "B", 4)])
            .unwrap()
            .clone();
        drop(reopened);

        let restarted = Blockchain::open(store).unwrap();
        assert_eq!(restarted.len(), 2);
        assert_eq!(restarted.tip(), &appended);
        assert!(restarted.validate().is_ok());
    }

    #[test]
    fn test_find_transaction() {
        let mut chain = create_test_chain();
        let tx = Transaction::new("A", "B", 3);
        let block_hash = chain.append(vec![tx.clone()]).unwrap().hash_hex();

        let (block, found) = chain.find_transaction(&tx.hash_hex()).unwrap();
        assert_eq!(block.hash_hex(), block_hash);
        assert_eq!(found, &tx);
        assert!(chain.find_transaction("00").is_none());
    }

    #[test]
    fn test_delete_blocks_from() {
        let mut chain = chain_with_blocks(4);
        assert!(matches!(
            chain.delete_blocks_from(0),
            Err(BlockchainError::InvalidBlock(_))
        ));
        assert!(matches!(
            chain.delete_blocks_from(4),
            Err(BlockchainError::BlockNotFound(4))
        ));

        assert_eq!(chain.delete_blocks_from(2).unwrap(), 2);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.store().load_blocks().unwrap(), chain.blocks().to_vec());

        chain.append(vec![Transaction::new("A", "B", 1)]).unwrap();
        assert_eq!(chain.store().load_blocks().unwrap().len(), 3);
        assert!(chain.validate().is_ok());
    }

    #[test]
    fn test_get_block_out_of_range() {
        let chain = create_test_chain();
        assert!(chain.get_block(0).is_ok());
        assert!(matches!(
            chain.get_block(1),
            Err(BlockchainError::BlockNotFound(1))
        ));
    }

    #[test]
    fn test_adopt_longer_valid_chain() {
        let mut local = chain_with_blocks(2);
        let remote = chain_with_blocks(3);

        assert!(local.adopt_chain(remote.blocks().to_vec()).unwrap());
        assert_eq!(local.blocks(), remote.blocks());
        assert_eq!(local.store().load_blocks().unwrap(), remote.blocks().to_vec());

        let store = local.store().clone();
        drop(local);
        let reopened = Blockchain::open(store).unwrap();
        assert_eq!(reopened.blocks(), remote.blocks());
    }

    #[test]
    fn test_adopt_rejects_short_or_broken_chains() {
        let mut local = chain_with_blocks(3);
        let before = local.blocks().to_vec();

        let shorter = chain_with_blocks(3);
        assert!(!local.adopt_chain(shorter.blocks().to_vec()).unwrap());

        let mut broken = chain_with_blocks(4).blocks().to_vec();
        broken[2].set_prev_hash_for_test(vec![0u8; 32]);
        assert!(!local.adopt_chain(broken).unwrap());

        let headless = chain_with_blocks(5).blocks()[1..].to_vec();
        assert!(!local.adopt_chain(headless).unwrap());

        assert_eq!(local.blocks(), before.as_slice());
    }
}

// This is the persistence layer - everything durable goes through sled
// Blocks are keyed by their own hash, and a second tree remembers mining order
// so a restart rebuilds the chain in the order it was mined

use crate::core::Block;
use crate::error::{BlockchainError, Result};
use log::{debug, info};
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::{Db, Transactional, Tree};
use std::path::{Path, PathBuf};

const BLOCKS_TREE: &str = "chaingo_blocks"; // block hash -> encoded block
const CHAIN_INDEX_TREE: &str = "chaingo_chain_index"; // big-endian height -> block hash
const WALLETS_TREE: &str = "chaingo_wallets"; // address -> encoded wallet

#[derive(Clone)]
pub struct Store {
    db: Db,
    blocks: Tree,
    chain_index: Tree,
    wallets: Tree,
    path: Option<PathBuf>,
}

impl Store {
    // When I want durable storage at a path on disk
    pub fn open(path: impl AsRef<Path>) -> Result<Store> {
        let path = path.as_ref().to_path_buf();
        let db = sled::open(&path)
            .map_err(|e| BlockchainError::Database(format!("Failed to open database: {e}")))?;
        info!("Opened block store at {}", path.display());
        Self::from_db(db, Some(path))
    }

    // When I want a throwaway store that disappears on drop (tests, dry runs)
    pub fn temporary() -> Result<Store> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| BlockchainError::Database(format!("Failed to open database: {e}")))?;
        Self::from_db(db, None)
    }

    fn from_db(db: Db, path: Option<PathBuf>) -> Result<Store> {
        let open = |name: &str| {
            db.open_tree(name).map_err(|e| {
                BlockchainError::Database(format!("Failed to open tree {name}: {e}"))
            })
        };
        Ok(Store {
            blocks: open(BLOCKS_TREE)?,
            chain_index: open(CHAIN_INDEX_TREE)?,
            wallets: open(WALLETS_TREE)?,
            db,
            path,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Writes the block under its hash and records it at `height`, atomically.
    pub fn put_block(&self, height: usize, block: &Block) -> Result<()> {
        let block_data = block.serialize()?;
        let height_key = (height as u64).to_be_bytes();

        (&self.blocks, &self.chain_index)
            .transaction(|(blocks, chain_index)| {
                blocks.insert(block.get_hash(), block_data.as_slice())?;
                chain_index.insert(&height_key[..], block.get_hash())?;
                Ok::<(), ConflictableTransactionError<()>>(())
            })
            .map_err(|e: TransactionError<()>| {
                BlockchainError::Database(format!("Failed to persist block: {e:?}"))
            })?;

        self.flush()?;
        debug!("Persisted block at height {height}");
        Ok(())
    }

    pub fn get_block(&self, hash: &[u8]) -> Result<Option<Block>> {
        match self.blocks.get(hash)? {
            Some(bytes) => Ok(Some(Block::deserialize(bytes.as_ref())?)),
            None => Ok(None),
        }
    }

    /// Every persisted block in mining order.
    pub fn load_blocks(&self) -> Result<Vec<Block>> {
        let mut blocks = Vec::new();
        for entry in self.chain_index.iter() {
            let (height, hash) = entry?;
            let block = self.get_block(hash.as_ref())?.ok_or_else(|| {
                BlockchainError::Database(format!(
                    "Chain index points at a missing block (height key {:?})",
                    height.as_ref()
                ))
            })?;
            blocks.push(block);
        }
        Ok(blocks)
    }

    /// Drops the index entries and block records from `height` upward.
    pub fn remove_blocks_from(&self, height: usize) -> Result<usize> {
        let start = (height as u64).to_be_bytes();
        let doomed: Vec<(sled::IVec, sled::IVec)> = self
            .chain_index
            .range(&start[..]..)
            .collect::<std::result::Result<_, _>>()?;

        (&self.blocks, &self.chain_index)
            .transaction(|(blocks, chain_index)| {
                for (height_key, hash) in &doomed {
                    chain_index.remove(height_key.clone())?;
                    blocks.remove(hash.clone())?;
                }
                Ok::<(), ConflictableTransactionError<()>>(())
            })
            .map_err(|e: TransactionError<()>| {
                BlockchainError::Database(format!("Failed to remove blocks: {e:?}"))
            })?;

        self.flush()?;
        Ok(doomed.len())
    }

    /// Swaps the whole persisted chain for `blocks` in one transaction, so a
    /// failure leaves the previous chain intact.
    pub fn replace_chain(&self, blocks: &[Block]) -> Result<()> {
        let encoded = blocks
            .iter()
            .map(|block| block.serialize())
            .collect::<Result<Vec<_>>>()?;
        let existing: Vec<(sled::IVec, sled::IVec)> = self
            .chain_index
            .iter()
            .collect::<std::result::Result<_, _>>()?;

        (&self.blocks, &self.chain_index)
            .transaction(|(block_tree, chain_index)| {
                for (height_key, hash) in &existing {
                    chain_index.remove(height_key.clone())?;
                    block_tree.remove(hash.clone())?;
                }
                for (height, (block, data)) in blocks.iter().zip(&encoded).enumerate() {
                    let height_key = (height as u64).to_be_bytes();
                    block_tree.insert(block.get_hash(), data.as_slice())?;
                    chain_index.insert(&height_key[..], block.get_hash())?;
                }
                Ok::<(), ConflictableTransactionError<()>>(())
            })
            .map_err(|e: TransactionError<()>| {
                BlockchainError::Database(format!("Failed to replace chain: {e:?}"))
            })?;

        self.flush()?;
        debug!(
            "Replaced {} persisted blocks with {}",
            existing.len(),
            blocks.len()
        );
        Ok(())
    }

    // Leaves the index entry dangling; only used to simulate a damaged store
    #[cfg(test)]
    pub(crate) fn remove_block_record(&self, hash: &[u8]) -> Result<()> {
        self.blocks.remove(hash)?;
        self.flush()
    }

    pub fn put_wallet(&self, address: &str, wallet_data: &[u8]) -> Result<()> {
        self.wallets.insert(address, wallet_data)?;
        self.flush()
    }

    pub fn get_wallet(&self, address: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.wallets.get(address)?.map(|bytes| bytes.to_vec()))
    }

    /// All wallet records in key order
    pub fn wallets(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let mut records = Vec::new();
        for entry in self.wallets.iter() {
            let (key, value) = entry?;
            let address = String::from_utf8(key.to_vec())
                .map_err(|e| BlockchainError::Database(format!("Invalid wallet key: {e}")))?;
            records.push((address, value.to_vec()));
        }
        Ok(records)
    }

    // Writes are only durable once flushed; every mutating call above ends here
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

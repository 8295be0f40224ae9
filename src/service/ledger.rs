// The ledger is the application state every command runs against:
// the shared chain, the pending pool, the wallet registry and, when running, the P2P node
// Anything that changes the chain or the pool is gossiped to peers afterwards

use crate::config::Config;
use crate::core::{Block, Blockchain, SharedChain, Transaction, GENESIS_ADDRESS};
use crate::error::{BlockchainError, Result};
use crate::network::{BroadcastReport, Message, Node, NodeOptions};
use crate::storage::{PendingPool, Store};
use crate::wallet::{Wallet, Wallets};
use log::{error, info};
use serde::Serialize;
use std::sync::{Arc, RwLockReadGuard, RwLockWriteGuard};
use std::thread::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainStats {
    pub blocks: usize,
    pub total_transactions: usize,
    pub pending_transactions: usize,
    pub latest_block_hash: String,
    pub peers: usize,
}

pub struct Ledger {
    chain: SharedChain,
    pending: PendingPool,
    wallets: Wallets,
    node: Option<Arc<Node>>,
    block_reward: i64,
}

impl Ledger {
    pub fn open(store: Store, block_reward: i64) -> Result<Ledger> {
        let chain = Blockchain::open(store.clone())?.into_shared();
        let wallets = Wallets::load(store)?;
        Ok(Ledger {
            chain,
            pending: PendingPool::new(),
            wallets,
            node: None,
            block_reward,
        })
    }

    pub fn from_config(config: &Config) -> Result<Ledger> {
        Ledger::open(Store::open(&config.db_path)?, config.block_reward)
    }

    /// Binds and starts a node over this ledger's chain. From then on mined
    /// blocks and new transactions are broadcast to its peers.
    pub fn start_node(&mut self, addr: &str, options: NodeOptions) -> Result<JoinHandle<()>> {
        if self.node.is_some() {
            return Err(BlockchainError::Network("Node already running".to_string()));
        }
        let node = Node::bind(addr, Arc::clone(&self.chain), options)?;
        let handle = node.start()?;
        self.node = Some(node);
        Ok(handle)
    }

    pub fn node(&self) -> Option<&Arc<Node>> {
        self.node.as_ref()
    }

    pub fn chain(&self) -> &SharedChain {
        &self.chain
    }

    pub fn create_wallet(&self) -> Result<Wallet> {
        self.wallets.create_wallet()
    }

    pub fn addresses(&self) -> Result<Vec<String>> {
        self.wallets.addresses()
    }

    pub fn wallet_balance(&self, address: &str) -> Result<i128> {
        Ok(self.read_chain()?.balance_of(address))
    }

    /// Signs a transfer with the wallet owning `private_key_hex`, checks the
    /// signature and queues it. The wallet must belong to `from`.
    pub fn create_and_sign_transaction(
        &self,
        from: &str,
        to: &str,
        amount: i64,
        private_key_hex: &str,
    ) -> Result<Transaction> {
        let wallet = self
            .wallets
            .find_by_private_key(private_key_hex)?
            .ok_or_else(|| {
                BlockchainError::Wallet("Invalid private key or wallet not found".to_string())
            })?;
        if wallet.address() != from {
            return Err(BlockchainError::Transaction(
                "Private key does not match from address".to_string(),
            ));
        }

        let mut tx = Transaction::new(from, to, amount);
        tx.sign(&wallet)?;
        if !tx.verify() {
            return Err(BlockchainError::Crypto(
                "Transaction signature verification failed".to_string(),
            ));
        }

        self.pending.add(tx.clone());
        info!("Queued transaction {}", tx.hash_hex());
        self.gossip(&Message::Transaction(tx.clone()));
        Ok(tx)
    }

    pub fn list_pending_transactions(&self) -> Vec<Transaction> {
        self.pending.list()
    }

    /// Mines the reward plus everything pending into a new block. Without a
    /// miner address the reward goes to "Genesis". On failure the pending
    /// transactions are put back.
    pub fn mine_block(&self, miner_address: Option<&str>) -> Result<Block> {
        let miner = miner_address
            .filter(|addr| !addr.is_empty())
            .unwrap_or(GENESIS_ADDRESS);

        let pending = self.pending.take_all();
        let mut transactions = Vec::with_capacity(pending.len() + 1);
        transactions.push(Transaction::new_coinbase(miner, self.block_reward));
        transactions.extend(pending.iter().cloned());

        let mined = self.write_chain().and_then(|mut chain| {
            let block = chain.append(transactions)?.clone();
            Ok(block)
        });
        let block = match mined {
            Ok(block) => block,
            Err(e) => {
                self.pending.restore(pending);
                return Err(e);
            }
        };

        info!(
            "New block {} is mined with {} pending transactions",
            block.hash_hex(),
            pending.len()
        );
        self.gossip(&Message::Block(block.clone()));
        Ok(block)
    }

    pub fn get_chain(&self) -> Result<Vec<Block>> {
        Ok(self.read_chain()?.blocks().to_vec())
    }

    pub fn get_block(&self, index: usize) -> Result<Block> {
        self.read_chain()?.get_block(index).cloned()
    }

    pub fn get_latest_block(&self) -> Result<Block> {
        Ok(self.read_chain()?.tip().clone())
    }

    pub fn validate_chain(&self) -> Result<()> {
        self.read_chain()?.validate()
    }

    pub fn delete_blocks_from(&self, index: usize) -> Result<usize> {
        self.write_chain()?.delete_blocks_from(index)
    }

    /// The containing block's hex hash and the transaction
    pub fn find_transaction(&self, hash_hex: &str) -> Result<Option<(String, Transaction)>> {
        let chain = self.read_chain()?;
        Ok(chain
            .find_transaction(&hash_hex.to_ascii_lowercase())
            .map(|(block, tx)| (block.hash_hex(), tx.clone())))
    }

    pub fn chain_stats(&self) -> Result<ChainStats> {
        let peers = match &self.node {
            Some(node) => node.peers().len()?,
            None => 0,
        };
        let chain = self.read_chain()?;
        Ok(ChainStats {
            blocks: chain.len(),
            total_transactions: chain.total_transactions(),
            pending_transactions: self.pending.len(),
            latest_block_hash: chain.tip().hash_hex(),
            peers,
        })
    }

    pub fn add_peer(&self, address: &str) -> Result<bool> {
        self.running_node()?.peers().add_peer(address)
    }

    pub fn list_peers(&self) -> Result<Vec<String>> {
        match &self.node {
            Some(node) => node.peers().list_peers(),
            None => Ok(Vec::new()),
        }
    }

    pub fn request_sync(&self) -> Result<BroadcastReport> {
        self.running_node()?.request_sync()
    }

    fn running_node(&self) -> Result<&Arc<Node>> {
        self.node
            .as_ref()
            .ok_or_else(|| BlockchainError::Network("Node is not running".to_string()))
    }

    // Gossip is best effort; the local operation already succeeded
    fn gossip(&self, message: &Message) {
        let Some(node) = &self.node else {
            return;
        };
        match node.broadcast(message) {
            Ok(report) if !report.pruned.is_empty() => {
                info!("Pruned unreachable peers: {}", report.pruned.join(", "))
            }
            Ok(_) => {}
            Err(e) => error!("Failed to broadcast {}: {e}", message.tag()),
        }
    }

    fn read_chain(&self) -> Result<RwLockReadGuard<'_, Blockchain>> {
        self.chain
            .read()
            .map_err(|_| BlockchainError::Database("Failed to acquire chain lock".to_string()))
    }

    fn write_chain(&self) -> Result<RwLockWriteGuard<'_, Blockchain>> {
        self.chain
            .write()
            .map_err(|_| BlockchainError::Database("Failed to acquire chain lock".to_string()))
    }
}

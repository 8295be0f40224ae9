use crate::error::{BlockchainError, Result};
use log::info;
use std::collections::HashSet;
use std::sync::RwLock;

/// The flat set of peer addresses a node gossips to.
///
/// There is no discovery, handshake or scoring: peers are added by hand and
/// dropped the first time a connection to them fails. Readers always get a
/// snapshot so no lock is held across network I/O.
#[derive(Default)]
pub struct PeerManager {
    peers: RwLock<HashSet<String>>,
}

impl PeerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a peer; returns false if it was already known
    pub fn add_peer(&self, address: &str) -> Result<bool> {
        let mut peers = self
            .peers
            .write()
            .map_err(|e| BlockchainError::Network(format!("Failed to acquire peer lock: {e}")))?;
        let added = peers.insert(address.to_string());
        if added {
            info!("Added peer: {address}");
        }
        Ok(added)
    }

    /// Removes a peer; returns false if it was not known
    pub fn remove_peer(&self, address: &str) -> Result<bool> {
        let mut peers = self
            .peers
            .write()
            .map_err(|e| BlockchainError::Network(format!("Failed to acquire peer lock: {e}")))?;
        let removed = peers.remove(address);
        if removed {
            info!("Removed peer: {address}");
        }
        Ok(removed)
    }

    /// Snapshot of the current peers, sorted for stable output
    pub fn list_peers(&self) -> Result<Vec<String>> {
        let peers = self
            .peers
            .read()
            .map_err(|e| BlockchainError::Network(format!("Failed to acquire peer lock: {e}")))?;
        let mut snapshot: Vec<String> = peers.iter().cloned().collect();
        snapshot.sort();
        Ok(snapshot)
    }

    pub fn contains(&self, address: &str) -> Result<bool> {
        let peers = self
            .peers
            .read()
            .map_err(|e| BlockchainError::Network(format!("Failed to acquire peer lock: {e}")))?;
        Ok(peers.contains(address))
    }

    pub fn len(&self) -> Result<usize> {
        let peers = self
            .peers
            .read()
            .map_err(|e| BlockchainError::Network(format!("Failed to acquire peer lock: {e}")))?;
        Ok(peers.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

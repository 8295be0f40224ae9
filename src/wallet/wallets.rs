// The wallet registry - every keypair this process has created, by address
// Records live in the store's wallet tree so they survive a restart;
// a record that fails to decode is skipped with a warning instead of failing the load

use crate::error::{BlockchainError, Result};
use crate::storage::Store;
use crate::wallet::Wallet;
use log::{info, warn};
use std::collections::HashMap;
use std::sync::RwLock;

pub struct Wallets {
    wallets: RwLock<HashMap<String, Wallet>>,
    store: Store,
}

impl Wallets {
    pub fn load(store: Store) -> Result<Wallets> {
        let mut wallets = HashMap::new();
        for (address, bytes) in store.wallets()? {
            match Wallet::deserialize(&bytes) {
                Ok(wallet) => {
                    wallets.insert(address, wallet);
                }
                Err(e) => warn!("Skipping unreadable wallet record {address}: {e}"),
            }
        }
        if !wallets.is_empty() {
            info!("Loaded {} wallets", wallets.len());
        }
        Ok(Wallets {
            wallets: RwLock::new(wallets),
            store,
        })
    }

    /// Generates a keypair, persists it and returns the new wallet
    pub fn create_wallet(&self) -> Result<Wallet> {
        let wallet = Wallet::generate()?;
        let address = wallet.address();
        self.store.put_wallet(&address, &wallet.serialize()?)?;
        self.write()?.insert(address.clone(), wallet.clone());
        info!("Created wallet {address}");
        Ok(wallet)
    }

    pub fn get_wallet(&self, address: &str) -> Result<Option<Wallet>> {
        Ok(self.read()?.get(address).cloned())
    }

    /// Known addresses, sorted
    pub fn addresses(&self) -> Result<Vec<String>> {
        let mut addresses: Vec<String> = self.read()?.keys().cloned().collect();
        addresses.sort();
        Ok(addresses)
    }

    /// Looks a wallet up by the hex of its private scalar
    pub fn find_by_private_key(&self, private_key_hex: &str) -> Result<Option<Wallet>> {
        if private_key_hex.is_empty() {
            return Ok(None);
        }
        let wallets = self.read()?;
        Ok(wallets
            .values()
            .find(|wallet| wallet.private_key_hex() == private_key_hex.to_ascii_lowercase())
            .cloned())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Wallet>>> {
        self.wallets
            .read()
            .map_err(|_| BlockchainError::Wallet("Failed to acquire wallet lock".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<String, Wallet>>> {
        self.wallets
            .write()
            .map_err(|_| BlockchainError::Wallet("Failed to acquire wallet lock".to_string()))
    }
}

use crate::error::{BlockchainError, Result};
use crate::utils::{
    deserialize, ecdsa_p256_sha256_sign_digest, new_key_pair, serialize, sha256_digest,
    signature_to_hex, signing_key,
};
use data_encoding::HEXLOWER;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A P-256 keypair. A wallet rebuilt from a public-key-only record can
/// still be used to derive the address but refuses to sign.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Wallet {
    private_key: Option<Vec<u8>>,
    public_key: Vec<u8>,
}

// Persisted form: an empty private key means watch-only
#[derive(bincode::Encode, bincode::Decode)]
struct WalletRecord {
    private_key: Vec<u8>,
    public_key: Vec<u8>,
}

impl Wallet {
    pub fn generate() -> Result<Wallet> {
        let (private_key, public_key) = new_key_pair()?;
        Ok(Wallet {
            private_key: Some(private_key),
            public_key,
        })
    }

    /// A wallet that can only be used to check signatures and derive the address
    pub fn watch_only(public_key: &[u8]) -> Wallet {
        Wallet {
            private_key: None,
            public_key: public_key.to_vec(),
        }
    }

    /// Hex SHA-256 of the public key bytes
    pub fn address(&self) -> String {
        address_of(&self.public_key)
    }

    pub fn public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }

    pub fn can_sign(&self) -> bool {
        self.private_key.is_some()
    }

    /// Hex of the private scalar, empty for a watch-only wallet
    pub fn private_key_hex(&self) -> String {
        self.private_key
            .as_ref()
            .map(|key| HEXLOWER.encode(key))
            .unwrap_or_default()
    }

    /// Signs `message` and returns the `(r, s)` pair as hex integers.
    /// Signing is randomized: the same message yields a new pair every call.
    pub fn sign(&self, message: &[u8]) -> Result<(String, String)> {
        let private_key = self.private_key.as_ref().ok_or_else(|| {
            BlockchainError::Wallet(format!("Wallet {} has no private key", self.address()))
        })?;
        let signature = ecdsa_p256_sha256_sign_digest(private_key, &self.public_key, message)?;
        signature_to_hex(&signature)
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(&WalletRecord {
            private_key: self.private_key.clone().unwrap_or_default(),
            public_key: self.public_key.clone(),
        })
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Wallet> {
        let mut record: WalletRecord = deserialize(bytes)?;
        if record.public_key.is_empty() {
            return Err(BlockchainError::Wallet(
                "Wallet record is missing its public key".to_string(),
            ));
        }
        let private_key = if record.private_key.is_empty() {
            None
        } else {
            // The public point is only usable for signing if it matches the scalar
            signing_key(&record.private_key, &record.public_key)?;
            Some(std::mem::take(&mut record.private_key))
        };
        Ok(Wallet {
            private_key,
            public_key: std::mem::take(&mut record.public_key),
        })
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address())
            .field("can_sign", &self.can_sign())
            .finish()
    }
}

pub fn address_of(public_key: &[u8]) -> String {
    HEXLOWER.encode(&sha256_digest(public_key))
}

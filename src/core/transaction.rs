// A transaction moves `amount` from one address string to another
// Signing stores the (r, s) pair and the signer's public key on the transaction itself,
// so anyone can re-check it later without looking anything up

use crate::error::Result;
use crate::utils::{
    deserialize, ecdsa_p256_sha256_sign_verify, serialize, sha256_digest, signature_from_hex,
};
use crate::wallet::Wallet;
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sender used for block rewards
pub const COINBASE_SENDER: &str = "Coinbase";
/// Sender and recipient of the genesis placeholder
pub const GENESIS_ADDRESS: &str = "Genesis";

#[derive(
    Debug,
    Clone,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    bincode::Encode,
    bincode::Decode,
)]
pub struct Transaction {
    from: String,
    to: String,
    amount: i64,
    r: String,
    s: String,
    public_key: Vec<u8>,
}

impl Transaction {
    /// An unsigned transfer
    pub fn new(from: &str, to: &str, amount: i64) -> Transaction {
        Transaction {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            ..Default::default()
        }
    }

    /// The unsigned reward transaction a miner adds to its own block
    pub fn new_coinbase(to: &str, reward: i64) -> Transaction {
        Transaction::new(COINBASE_SENDER, to, reward)
    }

    /// SHA-256 of `from ∥ to ∥ decimal(amount)`. Signature fields are not covered.
    pub fn hash(&self) -> Vec<u8> {
        let data = format!("{}{}{}", self.from, self.to, self.amount);
        sha256_digest(data.as_bytes())
    }

    pub fn hash_hex(&self) -> String {
        HEXLOWER.encode(&self.hash())
    }

    /// Signs the transaction hash with `wallet` and stores the signature and
    /// the wallet's public key. Signing again replaces the previous signature.
    pub fn sign(&mut self, wallet: &Wallet) -> Result<()> {
        let (r, s) = wallet.sign(&self.hash())?;
        self.r = r;
        self.s = s;
        self.public_key = wallet.public_key().to_vec();
        Ok(())
    }

    /// Checks the stored signature against the stored public key.
    /// Unsigned or malformed transactions simply fail.
    pub fn verify(&self) -> bool {
        let Some(signature) = signature_from_hex(&self.r, &self.s) else {
            return false;
        };
        ecdsa_p256_sha256_sign_verify(&self.public_key, &signature, &self.hash())
    }

    pub fn is_signed(&self) -> bool {
        !self.r.is_empty() && !self.s.is_empty()
    }

    pub fn is_coinbase(&self) -> bool {
        self.from == COINBASE_SENDER
    }

    pub fn get_from(&self) -> &str {
        self.from.as_str()
    }

    pub fn get_to(&self) -> &str {
        self.to.as_str()
    }

    pub fn get_amount(&self) -> i64 {
        self.amount
    }

    pub fn get_signature(&self) -> (&str, &str) {
        (self.r.as_str(), self.s.as_str())
    }

    pub fn get_public_key(&self) -> &[u8] {
        self.public_key.as_slice()
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        serialize(self)
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Transaction> {
        deserialize(bytes)
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}:{}", self.from, self.to, self.amount)
    }
}

use crate::core::Block;
use crate::utils::sha256_digest;
use data_encoding::HEXLOWER;
use log::{debug, info};
use num_bigint::BigUint;
use once_cell::sync::Lazy;

/// Fixed difficulty: a sealed hash must have this many leading zero bits
pub const TARGET_BITS: u32 = 16;

const MAX_NONCE: i64 = i64::MAX;

static TARGET: Lazy<BigUint> = Lazy::new(|| BigUint::from(1u8) << (256 - TARGET_BITS));

/// Mining and validation for one block. Only the sealed fields
/// (timestamp, transactions, previous hash) are read; `hash` and `nonce`
/// are what mining produces.
pub struct ProofOfWork<'a> {
    block: &'a Block,
    target: &'a BigUint,
}

impl<'a> ProofOfWork<'a> {
    pub fn new_proof_of_work(block: &'a Block) -> ProofOfWork<'a> {
        ProofOfWork {
            block,
            target: &TARGET,
        }
    }

    pub fn target() -> &'static BigUint {
        &TARGET
    }

    /// Checks the block's stored nonce against the target. The stored `hash`
    /// field is not compared with the recomputed digest.
    pub fn validate(block: &Block) -> bool {
        let pow = ProofOfWork::new_proof_of_work(block);
        let hash = sha256_digest(&pow.prepare_data(block.get_nonce()));
        pow.meets_target(&hash)
    }

    // timestamp (8 bytes BE) ∥ tx digest ∥ prev hash ∥ nonce (8 bytes BE)
    fn prepare_data(&self, nonce: i64) -> Vec<u8> {
        let tx_digest = self.block.hash_transactions();
        let prev_hash = self.block.get_prev_hash();
        let mut data = Vec::with_capacity(8 + tx_digest.len() + prev_hash.len() + 8);
        data.extend(self.block.get_timestamp().to_be_bytes());
        data.extend(tx_digest);
        data.extend(prev_hash);
        data.extend(nonce.to_be_bytes());
        data
    }

    fn meets_target(&self, hash: &[u8]) -> bool {
        BigUint::from_bytes_be(hash) < *self.target
    }

    /// Searches nonces from zero upward and returns the first `(hash, nonce)`
    /// whose digest falls strictly below the target.
    pub fn run(&self) -> (Vec<u8>, i64) {
        let mut nonce = 0;
        let mut hash = Vec::new();
        debug!(
            "Mining block with {} transactions",
            self.block.get_transactions().len()
        );
        while nonce < MAX_NONCE {
            hash = sha256_digest(&self.prepare_data(nonce));
            if self.meets_target(&hash) {
                break;
            }
            nonce += 1;
        }
        info!("Sealed block {} with nonce {nonce}", HEXLOWER.encode(&hash));
        (hash, nonce)
    }
}

/// Leading-zero view of a digest, handy for logs and tests
pub fn leading_zero_bits(hash: &[u8]) -> u32 {
    let width = (hash.len() * 8) as u64;
    (width - BigUint::from_bytes_be(hash).bits()) as u32
}

use num_bigint::BigUint;
use ring::digest::{Context, SHA256};
use ring::rand::SystemRandom;
use ring::signature::{
    EcdsaKeyPair, KeyPair, UnparsedPublicKey, ECDSA_P256_SHA256_FIXED,
    ECDSA_P256_SHA256_FIXED_SIGNING,
};

use crate::error::{BlockchainError, Result};
use std::time::{SystemTime, UNIX_EPOCH};

/// Length of a P-256 private scalar and of each signature component
pub const P256_SCALAR_LEN: usize = 32;

// ECPrivateKey { version 1, privateKey OCTET STRING (32) } inside the PKCS#8 document
const EC_PRIVATE_KEY_MARKER: [u8; 5] = [0x02, 0x01, 0x01, 0x04, 0x20];

/// Current time in whole seconds since the Unix epoch
pub fn current_timestamp() -> Result<i64> {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| BlockchainError::Crypto(format!("System time error: {e}")))?
        .as_secs();

    i64::try_from(duration).map_err(|_| BlockchainError::Crypto("Timestamp overflow".to_string()))
}

pub fn sha256_digest(data: &[u8]) -> Vec<u8> {
    let mut context = Context::new(&SHA256);
    context.update(data);
    let digest = context.finish();
    digest.as_ref().to_vec()
}

/// Generates a fresh P-256 keypair and returns `(private_scalar, public_key)`.
///
/// The public key is the uncompressed SEC1 point (`0x04 ∥ X ∥ Y`).
pub fn new_key_pair() -> Result<(Vec<u8>, Vec<u8>)> {
    let rng = SystemRandom::new();
    let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, &rng)
        .map_err(|e| BlockchainError::Crypto(format!("Failed to generate ECDSA key pair: {e}")))?;
    let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_FIXED_SIGNING, pkcs8.as_ref(), &rng)
        .map_err(|e| {
            BlockchainError::Crypto(format!("Failed to create key pair from PKCS8: {e}"))
        })?;
    let private_key = pkcs8_private_scalar(pkcs8.as_ref())?;
    let public_key = key_pair.public_key().as_ref().to_vec();
    Ok((private_key, public_key))
}

fn pkcs8_private_scalar(pkcs8: &[u8]) -> Result<Vec<u8>> {
    let start = pkcs8
        .windows(EC_PRIVATE_KEY_MARKER.len())
        .position(|window| window == EC_PRIVATE_KEY_MARKER)
        .map(|pos| pos + EC_PRIVATE_KEY_MARKER.len())
        .ok_or_else(|| BlockchainError::Crypto("PKCS8 document has no EC private key".into()))?;
    pkcs8
        .get(start..start + P256_SCALAR_LEN)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| BlockchainError::Crypto("PKCS8 private key truncated".to_string()))
}

/// Rebuilds a signing key from its private scalar and public point.
/// ring rejects the pair if the point does not belong to the scalar.
pub fn signing_key(private_key: &[u8], public_key: &[u8]) -> Result<EcdsaKeyPair> {
    let rng = SystemRandom::new();
    EcdsaKeyPair::from_private_key_and_public_key(
        &ECDSA_P256_SHA256_FIXED_SIGNING,
        private_key,
        public_key,
        &rng,
    )
    .map_err(|e| BlockchainError::Crypto(format!("Rejected key pair: {e}")))
}

/// Signs `message` (hashed internally with SHA-256) and returns the fixed
/// `r ∥ s` encoding. ring draws a fresh nonce per call, so repeated
/// signatures over the same message differ.
pub fn ecdsa_p256_sha256_sign_digest(
    private_key: &[u8],
    public_key: &[u8],
    message: &[u8],
) -> Result<Vec<u8>> {
    let rng = SystemRandom::new();
    let key_pair = signing_key(private_key, public_key)?;
    let signature = key_pair
        .sign(&rng, message)
        .map_err(|e| BlockchainError::Crypto(format!("Failed to sign message: {e}")))?
        .as_ref()
        .to_vec();
    Ok(signature)
}

pub fn ecdsa_p256_sha256_sign_verify(public_key: &[u8], signature: &[u8], message: &[u8]) -> bool {
    let peer_public_key = UnparsedPublicKey::new(&ECDSA_P256_SHA256_FIXED, public_key);
    peer_public_key.verify(message, signature).is_ok()
}

/// Splits a fixed `r ∥ s` signature into two minimal lowercase hex integers
pub fn signature_to_hex(signature: &[u8]) -> Result<(String, String)> {
    if signature.len() != 2 * P256_SCALAR_LEN {
        return Err(BlockchainError::Crypto(format!(
            "Unexpected signature length {}",
            signature.len()
        )));
    }
    let (r, s) = signature.split_at(P256_SCALAR_LEN);
    Ok((
        BigUint::from_bytes_be(r).to_str_radix(16),
        BigUint::from_bytes_be(s).to_str_radix(16),
    ))
}

/// Inverse of [`signature_to_hex`]. `None` when either component is empty,
/// not hex, or too wide for the curve.
pub fn signature_from_hex(r: &str, s: &str) -> Option<Vec<u8>> {
    let mut signature = vec![0u8; 2 * P256_SCALAR_LEN];
    for (component, slot) in [r, s].iter().zip(signature.chunks_mut(P256_SCALAR_LEN)) {
        if component.is_empty() {
            return None;
        }
        let bytes = BigUint::parse_bytes(component.as_bytes(), 16)?.to_bytes_be();
        if bytes.len() > P256_SCALAR_LEN {
            return None;
        }
        slot[P256_SCALAR_LEN - bytes.len()..].copy_from_slice(&bytes);
    }
    Some(signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        let digest = sha256_digest(b"abc");
        assert_eq!(
            data_encoding::HEXLOWER.encode(&digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_key_pair_shapes() {
        let (private_key, public_key) = new_key_pair().unwrap();
        assert_eq!(private_key.len(), P256_SCALAR_LEN);
        assert_eq!(public_key.len(), 65);
        assert_eq!(public_key[0], 0x04);
    }

    #[test]
    fn test_extracted_scalar_rebuilds_key() {
        let (private_key, public_key) = new_key_pair().unwrap();
        let key_pair = signing_key(&private_key, &public_key).unwrap();
        assert_eq!(key_pair.public_key().as_ref(), public_key.as_slice());
    }

    #[test]
    fn test_sign_and_verify() {
        let (private_key, public_key) = new_key_pair().unwrap();
        let signature =
            ecdsa_p256_sha256_sign_digest(&private_key, &public_key, b"payload").unwrap();
        assert_eq!(signature.len(), 2 * P256_SCALAR_LEN);
        assert!(ecdsa_p256_sha256_sign_verify(&public_key, &signature, b"payload"));
        assert!(!ecdsa_p256_sha256_sign_verify(&public_key, &signature, b"other"));
    }

    #[test]
    fn test_signature_hex_is_minimal_and_reversible() {
        let mut signature = vec![0u8; 64];
        signature[31] = 0x0a;
        signature[32] = 0xff;
        let (r, s) = signature_to_hex(&signature).unwrap();
        assert_eq!(r, "a");
        assert_eq!(s.len(), 64);
        assert_eq!(signature_from_hex(&r, &s).unwrap(), signature);
    }

    #[test]
    fn test_signature_from_bad_hex() {
        assert!(signature_from_hex("", "01").is_none());
        assert!(signature_from_hex("zz", "01").is_none());
        assert!(signature_from_hex(&"f".repeat(66), "01").is_none());
    }

    #[test]
    fn test_mismatched_pair_rejected() {
        let (private_key, _) = new_key_pair().unwrap();
        let (_, other_public) = new_key_pair().unwrap();
        assert!(signing_key(&private_key, &other_public).is_err());
    }
}

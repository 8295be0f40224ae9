// Every persisted record and wire payload goes through bincode's standard config
use crate::error::{BlockchainError, Result};

/// Encodes a value into its compact binary form
pub fn serialize<T: bincode::Encode>(data: &T) -> Result<Vec<u8>> {
    bincode::encode_to_vec(data, bincode::config::standard())
        .map_err(|e| BlockchainError::Serialization(format!("Serialization failed: {e}")))
}

/// Decodes a value and rejects input with trailing bytes left over
pub fn deserialize<T: bincode::Decode<()>>(bytes: &[u8]) -> Result<T> {
    let (data, read) = bincode::decode_from_slice(bytes, bincode::config::standard())
        .map_err(|e| BlockchainError::Serialization(format!("Deserialization failed: {e}")))?;
    if read != bytes.len() {
        return Err(BlockchainError::Serialization(format!(
            "Deserialization left {} trailing bytes",
            bytes.len() - read
        )));
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, bincode::Encode, bincode::Decode)]
    struct Record {
        key: String,
        body: Vec<u8>,
        height: u64,
    }

    #[test]
    fn test_record_survives_encoding() {
        let record = Record {
            key: "chaingo".to_string(),
            body: vec![4, 8, 15, 16, 23, 42],
            height: 7,
        };
        let bytes = serialize(&record).unwrap();
        let decoded: Record = deserialize(&bytes).unwrap();
        assert_eq!(record, decoded);
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = serialize(&42u64).unwrap();
        bytes.push(0);
        assert!(deserialize::<u64>(&bytes).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let result: Result<Record> = deserialize(&[0xFF, 0xFF, 0xFF, 0xFF]);
        assert!(result.is_err());
    }
}

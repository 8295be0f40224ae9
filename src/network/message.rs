// Wire format - every connection carries exactly one envelope:
// a type tag plus a payload whose shape depends on that tag
// Nothing here knows about sockets; the node frames and ships the bytes

use crate::core::{Block, Transaction};
use crate::error::{BlockchainError, Result};
use crate::utils::{deserialize, serialize};
use std::fmt;

pub const BLOCK_TAG: &str = "BLOCK";
pub const TRANSACTION_TAG: &str = "TRANSACTION";
pub const CHAIN_REQUEST_TAG: &str = "CHAIN_REQUEST";
pub const CHAIN_RESPONSE_TAG: &str = "CHAIN_RESPONSE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// A freshly mined block
    Block(Block),
    /// A signed transaction entering some node's pending pool
    Transaction(Transaction),
    /// Ask for the full chain; carries the address to reply to
    ChainRequest(String),
    /// The responder's full chain, genesis first
    ChainResponse(Vec<Block>),
}

#[derive(Debug, bincode::Encode, bincode::Decode)]
struct Envelope {
    kind: String,
    payload: Vec<u8>,
}

impl Message {
    pub fn tag(&self) -> &'static str {
        match self {
            Message::Block(_) => BLOCK_TAG,
            Message::Transaction(_) => TRANSACTION_TAG,
            Message::ChainRequest(_) => CHAIN_REQUEST_TAG,
            Message::ChainResponse(_) => CHAIN_RESPONSE_TAG,
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Block(block) => write!(f, "{} {}", self.tag(), block.hash_hex()),
            Message::Transaction(tx) => write!(f, "{} {tx}", self.tag()),
            Message::ChainRequest(addr) => write!(f, "{} reply-to={addr}", self.tag()),
            Message::ChainResponse(blocks) => write!(f, "{} height={}", self.tag(), blocks.len()),
        }
    }
}

pub fn encode_message(message: &Message) -> Result<Vec<u8>> {
    let payload = match message {
        Message::Block(block) => serialize(block)?,
        Message::Transaction(tx) => serialize(tx)?,
        Message::ChainRequest(addr) => serialize(addr)?,
        Message::ChainResponse(blocks) => serialize(blocks)?,
    };
    serialize(&Envelope {
        kind: message.tag().to_string(),
        payload,
    })
}

/// Decodes one envelope. The payload is decoded according to the tag, so a
/// payload of the wrong shape fails here instead of surfacing later.
pub fn decode_message(bytes: &[u8]) -> Result<Message> {
    let envelope: Envelope = deserialize(bytes)?;
    let payload = envelope.payload.as_slice();
    match envelope.kind.as_str() {
        BLOCK_TAG => Ok(Message::Block(deserialize(payload)?)),
        TRANSACTION_TAG => Ok(Message::Transaction(deserialize(payload)?)),
        CHAIN_REQUEST_TAG => Ok(Message::ChainRequest(deserialize(payload)?)),
        CHAIN_RESPONSE_TAG => Ok(Message::ChainResponse(deserialize(payload)?)),
        _ => Err(BlockchainError::UnknownMessageType(envelope.kind)),
    }
}

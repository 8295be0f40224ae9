//! Peer-to-peer networking
//!
//! One message per TCP connection, a flat peer set that prunes itself on
//! failed connects, and the chain-sync request/response exchange.

pub mod message;
pub mod node;
pub mod peer_manager;

pub use message::{decode_message, encode_message, Message};
pub use node::{send_message, BroadcastReport, Node, NodeEvent, NodeOptions, MAX_FRAME_SIZE};
pub use peer_manager::PeerManager;

// This is the P2P node - it listens for one-message connections and gossips to a flat peer list
// Every message gets its own TCP connection: connect, write one envelope, close
// Inbound connections are handled on their own thread so one stuck peer never blocks the rest

use crate::core::{Block, SharedChain, Transaction};
use crate::error::{BlockchainError, Result};
use crate::network::{decode_message, encode_message, Message, PeerManager};
use log::{debug, error, info, warn};
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Largest inbound frame a handler will read
pub const MAX_FRAME_SIZE: usize = 409_600;
const TCP_CONNECT_TIMEOUT: u64 = 5000;

#[derive(Debug, Clone, Copy)]
pub struct NodeOptions {
    pub max_frame_size: usize,
    pub connect_timeout: Duration,
}

impl Default for NodeOptions {
    fn default() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
            connect_timeout: Duration::from_millis(TCP_CONNECT_TIMEOUT),
        }
    }
}

/// What the node saw or did, published to every subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    BlockReceived { from: String, block: Block },
    TransactionReceived { from: String, transaction: Transaction },
    ChainRequested { from: String, reply_to: String },
    ChainSent { to: String, height: usize },
    /// A peer's chain arrived. It is reported, never merged.
    ChainReceived { from: String, blocks: Vec<Block> },
    MessageRejected { from: String, reason: String },
}

/// Outcome of one broadcast, one entry per peer in the snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: Vec<String>,
    /// Unreachable peers, already removed from the peer set
    pub pruned: Vec<String>,
    /// Connected but the write failed; these stay in the peer set
    pub failed: Vec<String>,
}

enum SendFailure {
    Unreachable(String),
    Write(String),
}

pub struct Node {
    addr: String,
    listener: Mutex<Option<TcpListener>>,
    chain: SharedChain,
    peers: PeerManager,
    options: NodeOptions,
    subscribers: Mutex<Vec<Sender<NodeEvent>>>,
}

impl Node {
    /// Binds the listening socket right away so the address is known (and
    /// taken) before `start` is called. Port 0 picks a free port.
    pub fn bind(addr: &str, chain: SharedChain, options: NodeOptions) -> Result<Arc<Node>> {
        let listener = TcpListener::bind(addr)
            .map_err(|e| BlockchainError::Network(format!("Failed to bind to {addr}: {e}")))?;
        let local_addr = listener.local_addr()?.to_string();
        info!("Node bound to {local_addr}");

        Ok(Arc::new(Node {
            addr: local_addr,
            listener: Mutex::new(Some(listener)),
            chain,
            peers: PeerManager::new(),
            options,
            subscribers: Mutex::new(Vec::new()),
        }))
    }

    pub fn addr(&self) -> &str {
        self.addr.as_str()
    }

    pub fn peers(&self) -> &PeerManager {
        &self.peers
    }

    pub fn chain(&self) -> &SharedChain {
        &self.chain
    }

    pub fn subscribe(&self) -> Result<Receiver<NodeEvent>> {
        let (tx, rx) = channel();
        self.subscribers
            .lock()
            .map_err(|_| BlockchainError::Network("Failed to acquire subscriber lock".to_string()))?
            .push(tx);
        Ok(rx)
    }

    fn publish(&self, event: NodeEvent) {
        match self.subscribers.lock() {
            // Dropped receivers unsubscribe themselves here
            Ok(mut subscribers) => subscribers.retain(|tx| tx.send(event.clone()).is_ok()),
            Err(_) => error!("Failed to acquire subscriber lock"),
        }
    }

    /// Starts the accept loop on its own thread. The loop runs for the life
    /// of the process; a node can only be started once.
    pub fn start(self: &Arc<Self>) -> Result<JoinHandle<()>> {
        let listener = self
            .listener
            .lock()
            .map_err(|_| BlockchainError::Network("Failed to acquire listener lock".to_string()))?
            .take()
            .ok_or_else(|| {
                BlockchainError::Network(format!("Node {} already started", self.addr))
            })?;

        let node = Arc::clone(self);
        let handle = thread::Builder::new()
            .name(format!("accept-{}", self.addr))
            .spawn(move || node.accept_loop(listener))?;
        info!("Node listening on {}", self.addr);
        Ok(handle)
    }

    fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let node = Arc::clone(&self);
                    thread::spawn(move || {
                        let peer = stream
                            .peer_addr()
                            .map(|addr| addr.to_string())
                            .unwrap_or_else(|_| "unknown".to_string());
                        if let Err(e) = node.handle_connection(stream, &peer) {
                            error!("Error handling connection from {peer}: {e}");
                        }
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {e}");
                }
            }
        }
    }

    // One connection, one message: read until the sender closes or the frame limit is hit
    fn handle_connection(self: &Arc<Self>, stream: TcpStream, peer: &str) -> Result<()> {
        let frame = self.read_frame(&stream, peer);
        let _ = stream.shutdown(Shutdown::Both);
        let frame = frame?;
        debug!("Received {} bytes from {peer}", frame.len());

        match decode_message(&frame) {
            Ok(message) => {
                self.dispatch(message, peer);
                Ok(())
            }
            Err(e) => {
                self.publish(NodeEvent::MessageRejected {
                    from: peer.to_string(),
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    // A failed read is a rejected message too, so subscribers hear about it
    fn read_frame(&self, reader: impl Read, peer: &str) -> Result<Vec<u8>> {
        let mut frame = Vec::new();
        if let Err(e) = reader
            .take(self.options.max_frame_size as u64)
            .read_to_end(&mut frame)
        {
            self.publish(NodeEvent::MessageRejected {
                from: peer.to_string(),
                reason: format!("Failed to read frame: {e}"),
            });
            return Err(e.into());
        }
        Ok(frame)
    }

    fn dispatch(self: &Arc<Self>, message: Message, peer: &str) {
        info!("Received {message} from {peer}");
        match message {
            // Received but not consumed: nothing is validated or appended
            Message::Block(block) => self.publish(NodeEvent::BlockReceived {
                from: peer.to_string(),
                block,
            }),
            Message::Transaction(transaction) => self.publish(NodeEvent::TransactionReceived {
                from: peer.to_string(),
                transaction,
            }),
            Message::ChainRequest(reply_to) => {
                info!("Peer {peer} requested chain sync. Replying to {reply_to}");
                self.publish(NodeEvent::ChainRequested {
                    from: peer.to_string(),
                    reply_to: reply_to.clone(),
                });
                let node = Arc::clone(self);
                thread::spawn(move || node.send_chain_to(&reply_to));
            }
            Message::ChainResponse(blocks) => {
                info!("Received chain from {peer}. Height: {}", blocks.len());
                self.publish(NodeEvent::ChainReceived {
                    from: peer.to_string(),
                    blocks,
                });
            }
        }
    }

    fn send_chain_to(&self, addr: &str) {
        // Snapshot under the read lock; the send happens without it
        let blocks = match self.chain.read() {
            Ok(chain) => chain.blocks().to_vec(),
            Err(_) => {
                error!("Failed to acquire chain lock while answering {addr}");
                return;
            }
        };
        let height = blocks.len();

        match send_message(addr, &Message::ChainResponse(blocks), self.options.connect_timeout) {
            Ok(()) => {
                info!("Sent chain (height: {height}) to {addr}");
                self.publish(NodeEvent::ChainSent {
                    to: addr.to_string(),
                    height,
                });
            }
            Err(e) => error!("Failed to send chain to {addr}: {e}"),
        }
    }

    /// Sends `message` to every peer in the current snapshot, one thread and
    /// one connection per peer. Peers that cannot be reached are removed.
    pub fn broadcast(&self, message: &Message) -> Result<BroadcastReport> {
        let bytes = Arc::new(encode_message(message)?);
        let peers = self.peers.list_peers()?;
        debug!("Broadcasting {} to {} peers", message.tag(), peers.len());

        let sends: Vec<(String, JoinHandle<std::result::Result<(), SendFailure>>)> = peers
            .into_iter()
            .map(|peer| {
                let bytes = Arc::clone(&bytes);
                let timeout = self.options.connect_timeout;
                let target = peer.clone();
                (peer, thread::spawn(move || deliver(&target, &bytes, timeout)))
            })
            .collect();

        let mut report = BroadcastReport::default();
        for (peer, send) in sends {
            match send.join() {
                Ok(Ok(())) => report.delivered.push(peer),
                Ok(Err(SendFailure::Unreachable(reason))) => {
                    warn!("Failed to connect to peer {peer}: {reason}");
                    self.peers.remove_peer(&peer)?;
                    report.pruned.push(peer);
                }
                Ok(Err(SendFailure::Write(reason))) => {
                    warn!("Failed to send to peer {peer}: {reason}");
                    report.failed.push(peer);
                }
                Err(_) => {
                    error!("Send thread for peer {peer} panicked");
                    report.failed.push(peer);
                }
            }
        }
        Ok(report)
    }

    /// Asks every peer for its chain, with this node's address as the reply target
    pub fn request_sync(&self) -> Result<BroadcastReport> {
        self.broadcast(&Message::ChainRequest(self.addr.clone()))
    }
}

/// Opens a connection to `addr`, writes one encoded message and closes
pub fn send_message(addr: &str, message: &Message, connect_timeout: Duration) -> Result<()> {
    let bytes = encode_message(message)?;
    deliver(addr, &bytes, connect_timeout).map_err(|failure| match failure {
        SendFailure::Unreachable(reason) => {
            BlockchainError::Network(format!("Failed to connect to {addr}: {reason}"))
        }
        SendFailure::Write(reason) => {
            BlockchainError::Network(format!("Failed to send data to {addr}: {reason}"))
        }
    })
}

fn deliver(
    addr: &str,
    bytes: &[u8],
    connect_timeout: Duration,
) -> std::result::Result<(), SendFailure> {
    let socket_addr = addr
        .to_socket_addrs()
        .map_err(|e| SendFailure::Unreachable(e.to_string()))?
        .next()
        .ok_or_else(|| SendFailure::Unreachable("address did not resolve".to_string()))?;

    let mut stream = TcpStream::connect_timeout(&socket_addr, connect_timeout)
        .map_err(|e| SendFailure::Unreachable(e.to_string()))?;

    stream
        .set_write_timeout(Some(connect_timeout))
        .map_err(|e| SendFailure::Write(e.to_string()))?;
    stream
        .write_all(bytes)
        .and_then(|_| stream.flush())
        .map_err(|e| SendFailure::Write(e.to_string()))?;
    let _ = stream.shutdown(Shutdown::Write);
    Ok(())
}

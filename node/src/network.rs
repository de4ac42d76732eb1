//! Network transport as seen by the node core.
//!
//! Peer management and wire encoding live behind [`Network`]. The node only
//! asks it to move blocks and votes. [`NullNetwork`] records every request
//! so tests can assert on traffic.

use std::net::SocketAddr;
use std::sync::Mutex;

use lattice_consensus::Vote;
use lattice_ledger::Block;
use rand::seq::SliceRandom;

pub trait Network: Send + Sync {
    /// Flood a block to peers.
    fn republish_block(&self, block: &Block);

    /// Ask a sample of peers to vote on `block`.
    fn broadcast_confirm_req(&self, block: &Block);

    fn send_confirm_req(&self, endpoint: SocketAddr, block: &Block);

    fn send_confirm_ack(&self, endpoint: SocketAddr, vote: &Vote);

    fn broadcast_confirm_ack(&self, vote: &Vote);

    /// Up to `count` connected peers in random order.
    fn random_peers(&self, count: usize) -> Vec<SocketAddr>;

    /// Our own endpoint, used as the origin of locally generated votes.
    fn endpoint(&self) -> SocketAddr;

    /// Number of connected peers.
    fn size(&self) -> usize {
        0
    }

    /// Called once when the node stops.
    fn stop(&self) {}
}

/// One request made of a [`NullNetwork`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NetworkMessage {
    Republish(Block),
    BroadcastConfirmReq(Block),
    ConfirmReq(SocketAddr, Block),
    ConfirmAck(SocketAddr, Vote),
    BroadcastConfirmAck(Vote),
}

/// In-memory network that records what the node sends.
pub struct NullNetwork {
    endpoint: SocketAddr,
    peers: Vec<SocketAddr>,
    sent: Mutex<Vec<NetworkMessage>>,
}

impl NullNetwork {
    pub fn new() -> Self {
        Self::with_peers(Vec::new())
    }

    pub fn with_peers(peers: Vec<SocketAddr>) -> Self {
        Self {
            endpoint: SocketAddr::from(([127, 0, 0, 1], 0)),
            peers,
            sent: Mutex::new(Vec::new()),
        }
    }

    /// Everything sent so far, oldest first.
    pub fn sent(&self) -> Vec<NetworkMessage> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }

    fn record(&self, message: NetworkMessage) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message);
        }
    }
}

impl Default for NullNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl Network for NullNetwork {
    fn republish_block(&self, block: &Block) {
        self.record(NetworkMessage::Republish(block.clone()));
    }

    fn broadcast_confirm_req(&self, block: &Block) {
        self.record(NetworkMessage::BroadcastConfirmReq(block.clone()));
    }

    fn send_confirm_req(&self, endpoint: SocketAddr, block: &Block) {
        self.record(NetworkMessage::ConfirmReq(endpoint, block.clone()));
    }

    fn send_confirm_ack(&self, endpoint: SocketAddr, vote: &Vote) {
        self.record(NetworkMessage::ConfirmAck(endpoint, vote.clone()));
    }

    fn broadcast_confirm_ack(&self, vote: &Vote) {
        self.record(NetworkMessage::BroadcastConfirmAck(vote.clone()));
    }

    fn random_peers(&self, count: usize) -> Vec<SocketAddr> {
        let mut peers = self.peers.clone();
        peers.shuffle(&mut rand::thread_rng());
        peers.truncate(count);
        peers
    }

    fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    fn size(&self) -> usize {
        self.peers.len()
    }
}

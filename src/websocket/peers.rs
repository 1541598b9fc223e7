//! Registered-peer sets for broadcast-style WebSocket handlers.
//!
//! # Responsibilities
//! - Track open sessions that joined a shared set
//! - Remove a session when its guard drops, including on error or panic
//! - Fan a message out to every peer, best effort
//!
//! # Design Decisions
//! - Broadcast iterates a snapshot; no map shard lock is held while sending
//! - Sends never wait: a full or closed peer queue fails that peer only

use std::sync::Arc;
use dashmap::DashMap;

use crate::error::HandlerFault;
use crate::net::connection::ConnectionId;
use crate::websocket::session::{PeerSender, WsMessage, WsSession};
use crate::websocket::upgrade::SocketHandler;

/// Outcome of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Peers whose queue accepted the message.
    pub delivered: usize,
    /// Peers that were full or already gone.
    pub failed: usize,
}

/// Concurrency-safe set of currently open peer sessions.
#[derive(Debug, Clone, Default)]
pub struct PeerSet {
    peers: Arc<DashMap<ConnectionId, PeerSender>>,
}

impl PeerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `session` to the set until the returned guard drops.
    pub fn join(&self, session: &WsSession) -> PeerGuard {
        self.join_sender(session.sender())
    }

    fn join_sender(&self, sender: PeerSender) -> PeerGuard {
        let id = sender.id();
        self.peers.insert(id, sender);
        tracing::debug!(session = %id, peers = self.peers.len(), "Peer joined");
        PeerGuard {
            peers: Arc::clone(&self.peers),
            id,
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.peers.contains_key(&id)
    }

    /// Queue `message` to every peer except `except`.
    pub fn broadcast(&self, message: &WsMessage, except: Option<ConnectionId>) -> BroadcastReport {
        let frame = message.to_frame();
        let targets: Vec<PeerSender> = self
            .peers
            .iter()
            .filter(|entry| Some(*entry.key()) != except)
            .map(|entry| entry.value().clone())
            .collect();

        let mut report = BroadcastReport::default();
        for peer in targets {
            if peer.try_deliver(frame.clone()) {
                report.delivered += 1;
            } else {
                report.failed += 1;
                tracing::debug!(session = %peer.id(), "Broadcast delivery failed");
            }
        }
        report
    }
}

/// Membership of one session in a `PeerSet`.
#[derive(Debug)]
pub struct PeerGuard {
    peers: Arc<DashMap<ConnectionId, PeerSender>>,
    id: ConnectionId,
}

impl PeerGuard {
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl Drop for PeerGuard {
    fn drop(&mut self) {
        self.peers.remove(&self.id);
        tracing::debug!(session = %self.id, peers = self.peers.len(), "Peer left");
    }
}

/// Handler that relays every text or binary message to all peers on the
/// same endpoint.
pub fn relay(peers: PeerSet, echo_to_sender: bool) -> impl SocketHandler {
    move |mut session: WsSession| {
        let peers = peers.clone();
        async move {
            let _membership = peers.join(&session);
            while let Some(message) = session.recv().await {
                if matches!(message, WsMessage::Close(_)) {
                    break;
                }
                let except = (!echo_to_sender).then(|| session.id());
                let report = peers.broadcast(&message, except);
                tracing::trace!(
                    session = %session.id(),
                    delivered = report.delivered,
                    failed = report.failed,
                    "Relayed message"
                );
            }
            Ok::<(), HandlerFault>(())
        }
    }
}

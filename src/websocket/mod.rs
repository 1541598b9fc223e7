//! WebSocket session management.
//!
//! # Data Flow
//! ```text
//! Upgrade request (dispatcher found a WsRouteKey)
//!     → axum WebSocketUpgrade performs the handshake
//!     → upgrade.rs wraps the socket in a WsSession
//!     → registered SocketHandler owns the session until it returns
//!     → peers.rs (optional) tracks the session for broadcast fan-out
//! ```
//!
//! # Design Decisions
//! - Handlers drive their own receive loop; the dispatcher does not
//!   participate after the handoff
//! - Peer membership is an RAII guard, so removal survives errors and panics
//! - Whether a broadcast echoes to its sender is the handler's choice

pub mod peers;
pub mod session;
pub mod upgrade;

pub use peers::{relay, BroadcastReport, PeerGuard, PeerSet};
pub use session::{CloseReason, PeerSender, SessionClosed, SessionState, WsMessage, WsSession};
pub use upgrade::{SharedSocketHandler, SocketHandler};

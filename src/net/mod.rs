//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bind, accept, connection limit)
//!     → accept.rs (task per connection, optional TLS handshake, hyper http1)
//!     → connection.rs (IDs, live connection count)
//!     → Hand off to HTTP layer (axum app)
//! ```
//!
//! # Design Decisions
//! - Bounded accept prevents resource exhaustion
//! - Every connection observes the shutdown signal and drains gracefully
//! - TLS is optional and handled transparently

pub mod accept;
pub mod connection;
pub mod listener;

pub use accept::AcceptLoop;
pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{ConnectionPermit, Listener, ListenerError};

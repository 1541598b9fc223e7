//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Start (server.rs):
//!     Parse addresses → Acquire certificate binding → Bind listeners
//!     → Spawn accept loops
//!
//! Stop (server.rs + shutdown.rs):
//!     Trigger shutdown → Accept loops exit and drop listeners
//!     → Connections drain → Release certificate binding
//! ```
//!
//! # Design Decisions
//! - Ordered startup: binding first, listeners second, traffic last
//! - Ordered shutdown: stop accept, drain, unbind

pub mod server;
pub mod shutdown;

pub use server::Server;
pub use shutdown::{Shutdown, ShutdownSignal};

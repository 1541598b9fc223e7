//! Multi-tenant HTTP/HTTPS/WebSocket front end.
//!
//! One plaintext listener and one optional TLS listener serve dynamic
//! routes, static directory trees and WebSocket endpoints, partitioned by
//! virtual host.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────────┐
//!                       │                      HOSTGATE                        │
//!                       │                                                      │
//!   Client Request      │  ┌─────────┐   ┌──────────┐   ┌──────────────────┐   │
//!   ────────────────────┼─▶│   net   │──▶│   http   │──▶│     routing      │   │
//!                       │  │ accept  │   │ dispatch │   │ RouteTable snap. │   │
//!                       │  └────┬────┘   └────┬─────┘   └──────────────────┘   │
//!                       │       │ TLS         │                                │
//!                       │  ┌────┴────┐        ├──▶ websocket (session, peers)  │
//!                       │  │   tls   │        ├──▶ dynamic handler             │
//!                       │  │ binding │        └──▶ static_files                │
//!                       │  └─────────┘                                         │
//!                       │                                                      │
//!                       │  ┌────────────────────────────────────────────────┐  │
//!                       │  │            Cross-Cutting Concerns              │  │
//!                       │  │  config · lifecycle · observability · error    │  │
//!                       │  └────────────────────────────────────────────────┘  │
//!                       └──────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod static_files;
pub mod tls;
pub mod websocket;

pub use config::ServerConfig;
pub use error::{BindingError, ConfigurationError, HandlerFault, ServerError};
pub use lifecycle::Server;
pub use routing::Registry;

//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Configuration phase:
//!     register_route / register_websocket / register_static_mount / register_host_root
//!     → key.rs (normalize host, check path syntax)
//!     → mount.rs (resolve root directory, keep mounts ordered)
//!     → registry.rs (publish new RouteTable snapshot)
//!
//! Per request:
//!     dispatcher loads one RouteTable snapshot
//!     → exact host lookup, then wildcard host
//! ```
//!
//! # Design Decisions
//! - Routes match exact literal paths (no patterns or parameters)
//! - Hosts compare case-insensitively, `*` is the fallback host
//! - Static mounts resolve by longest prefix, independent of registration order

pub mod key;
pub mod mount;
pub mod registry;

pub use key::{normalize_host, RouteKey, WsRouteKey};
pub use mount::{DocumentRoot, StaticMount};
pub use registry::{Registry, RouteTable};

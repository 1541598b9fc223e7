//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection (net::accept, hyper HTTP/1.1 connection)
//!     → dispatch.rs (axum app: request ID, trace span, fallback dispatcher)
//!     → request.rs (host, path, request ID, upgrade detection)
//!     → routing::RouteTable snapshot
//!     → websocket / handler.rs / static_files
//!     → response.rs (dispatcher-owned terminal responses)
//! ```

pub mod dispatch;
pub mod handler;
pub mod request;
pub mod response;

pub use dispatch::{build_router, AppState};
pub use handler::{BoxFuture, Handler, HandlerResult, SharedHandler};
pub use request::{RequestTarget, X_REQUEST_ID};

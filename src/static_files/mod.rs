//! Static content subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher (host root or mount hit)
//!     → serve.rs (percent-decode, classify file / directory / missing)
//!     → resolve.rs (lexical normalization + containment check, 403 on escape)
//!     → validators.rs (ETag, Last-Modified, 304)
//!     → range.rs (200 / 206 / 416)
//!     → listing.rs (browsable directories only)
//!     → streamed body
//! ```

pub mod listing;
pub mod mime;
pub mod range;
pub mod resolve;
pub mod serve;
pub mod validators;

pub use serve::{serve, ServeError, StaticRequest, DEFAULT_DOCUMENTS};

//! TLS certificate binding subsystem.
//!
//! # Data Flow
//! ```text
//! Server::start
//!     → lifecycle.rs (pre-clean, bind, remember ownership)
//!     → binding.rs (PlatformBinding trait, status → BindingError)
//!     → store.rs (rustls implementation: load PEM pair, hand out TlsAcceptor)
//! Server::stop
//!     → lifecycle.rs (unbind only if owned)
//! ```
//!
//! # Design Decisions
//! - The dispatcher never sees the binding mechanism; HTTPS accept loops
//!   only ask for a `TlsAcceptor`

pub mod binding;
pub mod lifecycle;
pub mod store;

pub use binding::{bind, unbind, BindStatus, PlatformBinding};
pub use lifecycle::CertificateBinding;
pub use store::RustlsBindings;

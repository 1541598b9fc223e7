//! Error taxonomy shared across subsystems.
//!
//! # Propagation
//! - `ConfigurationError`: raised synchronously by registration calls
//! - `BindingError`: fatal to `Server::start`, logged during pre-clean and stop
//! - `ServerError`: everything that can abort startup
//! - Per-connection failures never leave the connection task; they become
//!   HTTP status codes inside the dispatcher

use std::any::Any;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Error produced by a dynamic or WebSocket handler.
pub type HandlerFault = Box<dyn std::error::Error + Send + Sync>;

/// Rejected registration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Route or mount paths must start with `/`.
    #[error("path {0:?} must start with '/'")]
    InvalidPath(String),

    /// Host must not be empty (use `*` for the wildcard host).
    #[error("host must not be empty")]
    EmptyHost,

    /// Physical root does not exist or cannot be resolved.
    #[error("root directory {path:?} cannot be resolved: {source}")]
    UnresolvableRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Physical root resolves to something that is not a directory.
    #[error("root {0:?} is not a directory")]
    NotADirectory(PathBuf),
}

/// Failure reported by the platform TLS-binding service.
#[derive(Debug, Error)]
pub enum BindingError {
    /// The endpoint already carries a binding this process does not own.
    #[error("a certificate is already bound to {0}")]
    AlreadyExists(SocketAddr),

    /// No binding existed where one was required.
    #[error("no certificate is bound to {0}")]
    NotFound(SocketAddr),

    /// Any other platform failure.
    #[error("certificate binding on {endpoint} failed: {reason}")]
    Failed { endpoint: SocketAddr, reason: String },

    /// The platform bound the certificate but offers no TLS termination for it.
    #[error("no TLS termination available for {0}")]
    NoTermination(SocketAddr),
}

/// Errors that abort `Server::start`.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Address in configuration could not be parsed.
    #[error("invalid listen address {0:?}")]
    InvalidAddress(String),

    /// Listening socket could not be opened.
    #[error("failed to listen on {addr}: {source}")]
    Listen {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Certificate binding failed.
    #[error(transparent)]
    Binding(#[from] BindingError),
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

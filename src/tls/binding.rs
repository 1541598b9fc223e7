//! Platform TLS-binding interface.
//!
//! The platform attaches a certificate identity to a listening endpoint and
//! detaches it again. Statuses are mapped to `BindingError` here so callers
//! only deal with `Result`.

use std::net::SocketAddr;
use tokio_rustls::TlsAcceptor;

use crate::config::CertificateConfig;
use crate::error::BindingError;

/// Raw outcome of a platform call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindStatus {
    Success,
    AlreadyExists,
    NotFound,
    Failed(String),
}

/// A platform TLS-binding service.
pub trait PlatformBinding: Send + Sync + 'static {
    /// Attach `certificate` to `endpoint`.
    fn bind(&self, endpoint: SocketAddr, certificate: &CertificateConfig) -> BindStatus;

    /// Detach whatever certificate is attached to `endpoint`.
    fn unbind(&self, endpoint: SocketAddr) -> BindStatus;

    /// TLS termination for a bound endpoint, when the platform leaves the
    /// handshake to this process. Platforms that terminate TLS themselves
    /// return `None`.
    fn acceptor(&self, _endpoint: SocketAddr) -> Option<TlsAcceptor> {
        None
    }
}

/// Bind, failing on anything but success.
pub fn bind(
    platform: &dyn PlatformBinding,
    endpoint: SocketAddr,
    certificate: &CertificateConfig,
) -> Result<(), BindingError> {
    match platform.bind(endpoint, certificate) {
        BindStatus::Success => Ok(()),
        BindStatus::AlreadyExists => Err(BindingError::AlreadyExists(endpoint)),
        BindStatus::NotFound => Err(BindingError::NotFound(endpoint)),
        BindStatus::Failed(reason) => Err(BindingError::Failed { endpoint, reason }),
    }
}

/// Unbind. Nothing bound counts as success.
pub fn unbind(platform: &dyn PlatformBinding, endpoint: SocketAddr) -> Result<(), BindingError> {
    match platform.unbind(endpoint) {
        BindStatus::Success | BindStatus::NotFound => Ok(()),
        BindStatus::AlreadyExists => Err(BindingError::AlreadyExists(endpoint)),
        BindStatus::Failed(reason) => Err(BindingError::Failed { endpoint, reason }),
    }
}

//! Certificate binding lifecycle.
//!
//! ```text
//! Unbound ──acquire──→ (pre-clean unbind) ──bind──→ Bound
//! Bound ──release──→ Unbound
//! ```
//!
//! # Design Decisions
//! - Pre-clean failures are logged and ignored; "nothing to clean" is the
//!   usual case
//! - Only a binding this process acquired is ever released, so `release`
//!   on a never-bound lifecycle makes no platform call

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;

use crate::config::CertificateConfig;
use crate::error::BindingError;
use crate::tls::binding::{self, PlatformBinding};

/// Ownership of one certificate binding on one endpoint.
pub struct CertificateBinding {
    platform: Arc<dyn PlatformBinding>,
    endpoint: SocketAddr,
    certificate: CertificateConfig,
    bound: AtomicBool,
}

impl CertificateBinding {
    pub fn new(
        platform: Arc<dyn PlatformBinding>,
        endpoint: SocketAddr,
        certificate: CertificateConfig,
    ) -> Self {
        Self {
            platform,
            endpoint,
            certificate,
            bound: AtomicBool::new(false),
        }
    }

    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    /// Whether this process currently owns the binding.
    pub fn is_bound(&self) -> bool {
        self.bound.load(Ordering::Acquire)
    }

    /// Clear any stale binding, then bind. A no-op when already bound.
    pub fn acquire(&self) -> Result<(), BindingError> {
        if self.is_bound() {
            return Ok(());
        }

        if let Err(e) = binding::unbind(self.platform.as_ref(), self.endpoint) {
            tracing::warn!(endpoint = %self.endpoint, error = %e, "Pre-clean of certificate binding failed");
        }

        binding::bind(self.platform.as_ref(), self.endpoint, &self.certificate)?;
        self.bound.store(true, Ordering::Release);
        tracing::info!(
            endpoint = %self.endpoint,
            thumbprint = %self.certificate.thumbprint,
            store = %self.certificate.store,
            "Certificate bound"
        );
        Ok(())
    }

    /// Unbind if owned. Safe to call any number of times; a failed unbind
    /// keeps ownership so a later call retries.
    pub fn release(&self) -> Result<(), BindingError> {
        if !self.is_bound() {
            return Ok(());
        }
        binding::unbind(self.platform.as_ref(), self.endpoint)?;
        self.bound.store(false, Ordering::Release);
        tracing::info!(endpoint = %self.endpoint, "Certificate unbound");
        Ok(())
    }

    /// TLS termination for the bound endpoint, if the platform provides it.
    pub fn acceptor(&self) -> Option<TlsAcceptor> {
        self.platform.acceptor(self.endpoint)
    }
}

impl fmt::Debug for CertificateBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateBinding")
            .field("endpoint", &self.endpoint)
            .field("certificate", &self.certificate)
            .field("bound", &self.is_bound())
            .finish()
    }
}

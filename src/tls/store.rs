//! rustls-backed binding service.
//!
//! # Design Decisions
//! - The certificate store is a directory; a thumbprint names
//!   `<store>/<thumbprint>.pem` (chain) and `<store>/<thumbprint>.key`
//! - Binding loads and validates the pair into a `rustls::ServerConfig`
//!   held per endpoint; the HTTPS accept loop asks for its acceptor
//! - One binding per endpoint, enforced here like a platform would

use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use rustls::ServerConfig;
use tokio_rustls::TlsAcceptor;

use crate::config::CertificateConfig;
use crate::tls::binding::{BindStatus, PlatformBinding};

/// In-process certificate bindings terminated with rustls.
#[derive(Debug, Default)]
pub struct RustlsBindings {
    bound: DashMap<SocketAddr, Arc<ServerConfig>>,
}

impl RustlsBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_bound(&self, endpoint: SocketAddr) -> bool {
        self.bound.contains_key(&endpoint)
    }
}

impl PlatformBinding for RustlsBindings {
    fn bind(&self, endpoint: SocketAddr, certificate: &CertificateConfig) -> BindStatus {
        match self.bound.entry(endpoint) {
            Entry::Occupied(_) => BindStatus::AlreadyExists,
            Entry::Vacant(slot) => match load_server_config(certificate) {
                Ok(config) => {
                    slot.insert(Arc::new(config));
                    BindStatus::Success
                }
                Err(reason) => BindStatus::Failed(reason),
            },
        }
    }

    fn unbind(&self, endpoint: SocketAddr) -> BindStatus {
        match self.bound.remove(&endpoint) {
            Some(_) => BindStatus::Success,
            None => BindStatus::NotFound,
        }
    }

    fn acceptor(&self, endpoint: SocketAddr) -> Option<TlsAcceptor> {
        self.bound
            .get(&endpoint)
            .map(|config| TlsAcceptor::from(Arc::clone(config.value())))
    }
}

/// Paths of the chain and key files for `certificate`.
pub fn certificate_files(certificate: &CertificateConfig) -> Result<(PathBuf, PathBuf), String> {
    let thumbprint = certificate.thumbprint.trim();
    let valid = !thumbprint.is_empty()
        && thumbprint
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !valid {
        return Err(format!("invalid certificate thumbprint {thumbprint:?}"));
    }

    let store = Path::new(&certificate.store);
    Ok((
        store.join(format!("{thumbprint}.pem")),
        store.join(format!("{thumbprint}.key")),
    ))
}

fn load_server_config(certificate: &CertificateConfig) -> Result<ServerConfig, String> {
    let (chain_path, key_path) = certificate_files(certificate)?;
    let chain = load_chain(&chain_path)?;
    let key = load_key(&key_path)?;

    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let mut config = ServerConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| e.to_string())?
        .with_no_client_auth()
        .with_single_cert(chain, key)
        .map_err(|e| format!("certificate {}: {e}", chain_path.display()))?;
    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(config)
}

fn load_chain(path: &Path) -> Result<Vec<CertificateDer<'static>>, String> {
    let file = File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let chain = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("{}: {e}", path.display()))?;
    if chain.is_empty() {
        return Err(format!("{}: no certificates found", path.display()));
    }
    Ok(chain)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, String> {
    let file = File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
    rustls_pemfile::private_key(&mut BufReader::new(file))
        .map_err(|e| format!("{}: {e}", path.display()))?
        .ok_or_else(|| format!("{}: no private key found", path.display()))
}

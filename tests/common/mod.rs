//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use hostgate::config::{CertificateConfig, ListenerConfig, ServerConfig};
use hostgate::tls::{BindStatus, PlatformBinding, RustlsBindings};
use hostgate::Server;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_rustls::TlsAcceptor;

/// Config listening on an ephemeral loopback port with a short drain.
pub fn local_config() -> ServerConfig {
    ServerConfig {
        listener: ListenerConfig {
            http_address: "127.0.0.1:0".to_string(),
            drain_secs: 1,
            ..ListenerConfig::default()
        },
        ..ServerConfig::default()
    }
}

/// Start `server` and return its plaintext address.
pub async fn start(server: &Server) -> SocketAddr {
    server.start().await.unwrap();
    server.http_addr().unwrap()
}

/// Client without connection pooling or system proxies.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap()
}

/// Write `content` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: impl AsRef<[u8]>) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

/// Send a raw HTTP/1.1 request and return the whole response as text.
/// Used where a client library would normalize the request path.
pub async fn raw_request(addr: SocketAddr, request_line: &str, host: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("{request_line}\r\nHost: {host}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    tokio::time::timeout(Duration::from_secs(10), stream.read_to_end(&mut response))
        .await
        .unwrap()
        .unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

/// Self-signed certificate for `localhost`, written to `store` as
/// `<thumbprint>.pem` / `<thumbprint>.key`. Returns the identity and the
/// PEM text of the certificate.
pub fn write_certificate(store: &Path, thumbprint: &str) -> (CertificateConfig, String) {
    let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let pem = certified.cert.pem();
    std::fs::write(store.join(format!("{thumbprint}.pem")), &pem).unwrap();
    std::fs::write(
        store.join(format!("{thumbprint}.key")),
        certified.key_pair.serialize_pem(),
    )
    .unwrap();

    let identity = CertificateConfig {
        thumbprint: thumbprint.to_string(),
        store: store.to_string_lossy().into_owned(),
    };
    (identity, pem)
}

/// Platform binding that records calls and answers with programmable
/// statuses. With an inner `RustlsBindings` it also terminates TLS.
#[derive(Default)]
pub struct MockBinding {
    inner: Option<RustlsBindings>,
    calls: Mutex<Vec<&'static str>>,
    bind_status: Mutex<Option<BindStatus>>,
    unbind_status: Mutex<Option<BindStatus>>,
}

impl MockBinding {
    pub fn terminating() -> Self {
        Self {
            inner: Some(RustlsBindings::new()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| **c == call).count()
    }

    pub fn fail_bind(&self, status: BindStatus) {
        *self.bind_status.lock().unwrap() = Some(status);
    }

    pub fn fail_unbind(&self, status: BindStatus) {
        *self.unbind_status.lock().unwrap() = Some(status);
    }

    pub fn heal(&self) {
        *self.bind_status.lock().unwrap() = None;
        *self.unbind_status.lock().unwrap() = None;
    }
}

impl PlatformBinding for MockBinding {
    fn bind(&self, endpoint: SocketAddr, certificate: &CertificateConfig) -> BindStatus {
        self.calls.lock().unwrap().push("bind");
        if let Some(status) = self.bind_status.lock().unwrap().clone() {
            return status;
        }
        match &self.inner {
            Some(inner) => inner.bind(endpoint, certificate),
            None => BindStatus::Success,
        }
    }

    fn unbind(&self, endpoint: SocketAddr) -> BindStatus {
        self.calls.lock().unwrap().push("unbind");
        if let Some(status) = self.unbind_status.lock().unwrap().clone() {
            return status;
        }
        match &self.inner {
            Some(inner) => inner.unbind(endpoint),
            None => BindStatus::NotFound,
        }
    }

    fn acceptor(&self, endpoint: SocketAddr) -> Option<TlsAcceptor> {
        self.inner.as_ref().and_then(|inner| inner.acceptor(endpoint))
    }
}

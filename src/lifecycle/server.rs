//! Server lifecycle controller.
//!
//! # Responsibilities
//! - Own the registry, the binding provider and the running accept loops
//! - Sequence start: certificate binding, listeners, accept loops
//! - Sequence stop: signal, await accept loops, drain, release binding
//!
//! # Design Decisions
//! - `start` on a running server and `stop` on a stopped one are no-ops
//! - Listeners are bound before `start` returns, so bind errors surface
//!   to the caller and `http_addr()` is valid immediately after
//! - A binding acquired by a failed `start` is released before the error
//!   is returned; if that release fails, `stop` retries it
//! - In-flight requests are never cancelled; `stop` waits for them up to
//!   `listener.drain_secs`

use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use arc_swap::ArcSwapOption;
use axum::http::Method;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

use crate::config::ServerConfig;
use crate::error::{BindingError, ConfigurationError, ServerError};
use crate::http::build_router;
use crate::http::handler::Handler;
use crate::lifecycle::shutdown::Shutdown;
use crate::net::{AcceptLoop, ConnectionTracker, Listener, ListenerError};
use crate::routing::Registry;
use crate::tls::{CertificateBinding, PlatformBinding, RustlsBindings};
use crate::websocket::{relay, PeerSet, SocketHandler};

const DRAIN_POLL: Duration = Duration::from_millis(25);

/// Addresses of a running server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BoundAddrs {
    http: SocketAddr,
    https: Option<SocketAddr>,
}

struct Running {
    shutdown: Shutdown,
    tasks: Vec<JoinHandle<()>>,
}

#[derive(Default)]
struct Lifecycle {
    running: Option<Running>,
    binding: Option<Arc<CertificateBinding>>,
}

/// A multi-tenant HTTP/HTTPS/WebSocket server.
pub struct Server {
    config: ServerConfig,
    registry: Arc<Registry>,
    platform: Arc<dyn PlatformBinding>,
    tracker: ConnectionTracker,
    addrs: ArcSwapOption<BoundAddrs>,
    lifecycle: Mutex<Lifecycle>,
}

impl Server {
    /// Server with an empty registry and the rustls binding provider.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            registry: Arc::new(Registry::new()),
            platform: Arc::new(RustlsBindings::new()),
            tracker: ConnectionTracker::new(),
            addrs: ArcSwapOption::empty(),
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    /// Server with every host root, static mount and relay from `config`
    /// registered.
    pub fn from_config(config: ServerConfig) -> Result<Self, ConfigurationError> {
        let server = Self::new(config);
        let registry = &server.registry;

        for host_root in &server.config.host_roots {
            registry.register_host_root(&host_root.host, &host_root.root, host_root.browsable)?;
        }
        for mount in &server.config.static_mounts {
            registry.register_static_mount(&mount.host, &mount.prefix, &mount.root, mount.browsable)?;
        }
        for relay_config in &server.config.websocket_relays {
            registry.register_websocket(
                &relay_config.host,
                &relay_config.path,
                relay(PeerSet::new(), relay_config.echo_to_sender),
            )?;
        }

        Ok(server)
    }

    /// Replace the platform TLS-binding service. Takes effect on the next start.
    pub fn with_binding_provider(mut self, platform: Arc<dyn PlatformBinding>) -> Self {
        self.platform = platform;
        self
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn register_route<H: Handler>(
        &self,
        host: &str,
        method: Method,
        path: &str,
        handler: H,
    ) -> Result<(), ConfigurationError> {
        self.registry.register_route(host, method, path, handler)
    }

    pub fn register_websocket<H: SocketHandler>(
        &self,
        host: &str,
        path: &str,
        handler: H,
    ) -> Result<(), ConfigurationError> {
        self.registry.register_websocket(host, path, handler)
    }

    pub fn register_static_mount(
        &self,
        host: &str,
        prefix: &str,
        root: impl AsRef<Path>,
        browsable: bool,
    ) -> Result<(), ConfigurationError> {
        self.registry.register_static_mount(host, prefix, root, browsable)
    }

    pub fn register_host_root(
        &self,
        host: &str,
        root: impl AsRef<Path>,
        browsable: bool,
    ) -> Result<(), ConfigurationError> {
        self.registry.register_host_root(host, root, browsable)
    }

    /// Plaintext address while running.
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.addrs.load_full().map(|a| a.http)
    }

    /// TLS address while running with HTTPS configured.
    pub fn https_addr(&self) -> Option<SocketAddr> {
        self.addrs.load_full().and_then(|a| a.https)
    }

    pub fn is_running(&self) -> bool {
        self.addrs.load().is_some()
    }

    /// Connections accepted and not yet closed, across both listeners.
    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }

    /// Bind the certificate (if HTTPS is configured), bind listeners and
    /// start accepting. A no-op if already running.
    pub async fn start(&self) -> Result<(), ServerError> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.running.is_some() {
            tracing::debug!("Server already running");
            return Ok(());
        }

        let listener_config = &self.config.listener;
        let http_addr = parse_addr(&listener_config.http_address)?;

        let https = match &listener_config.https {
            Some(https) => {
                let endpoint = parse_addr(&https.address)?;
                let binding = Arc::clone(lifecycle.binding.get_or_insert_with(|| {
                    Arc::new(CertificateBinding::new(
                        Arc::clone(&self.platform),
                        endpoint,
                        https.certificate.clone(),
                    ))
                }));
                binding.acquire()?;
                Some((endpoint, binding))
            }
            None => None,
        };

        let listeners = match self.bind_listeners(http_addr, https.as_ref()) {
            Ok(listeners) => listeners,
            Err(e) => {
                if let Some((_, binding)) = &https {
                    release_logged(binding);
                }
                return Err(e);
            }
        };

        let shutdown = Shutdown::new();
        let app = build_router(Arc::clone(&self.registry));
        let mut tasks = Vec::with_capacity(listeners.len());
        let mut addrs = BoundAddrs {
            http: http_addr,
            https: None,
        };

        for (listener, tls) in listeners {
            match tls {
                Some(_) => addrs.https = Some(listener.local_addr()),
                None => addrs.http = listener.local_addr(),
            }
            let accept_loop = AcceptLoop {
                listener,
                app: app.clone(),
                tls,
                shutdown: shutdown.subscribe(),
                tracker: self.tracker.clone(),
            };
            tasks.push(tokio::spawn(accept_loop.run()));
        }

        tracing::info!(
            http = %addrs.http,
            https = ?addrs.https,
            "Server started"
        );
        self.addrs.store(Some(Arc::new(addrs)));
        lifecycle.running = Some(Running { shutdown, tasks });
        Ok(())
    }

    fn bind_listeners(
        &self,
        http_addr: SocketAddr,
        https: Option<&(SocketAddr, Arc<CertificateBinding>)>,
    ) -> Result<Vec<(Listener, Option<TlsAcceptor>)>, ServerError> {
        let max_connections = self.config.listener.max_connections;
        let mut listeners = Vec::with_capacity(2);

        listeners.push((Listener::bind(http_addr, max_connections).map_err(listen_error)?, None));

        if let Some((endpoint, binding)) = https {
            let acceptor = binding
                .acceptor()
                .ok_or(BindingError::NoTermination(*endpoint))?;
            let listener = Listener::bind(*endpoint, max_connections).map_err(listen_error)?;
            listeners.push((listener, Some(acceptor)));
        }

        Ok(listeners)
    }

    /// Stop accepting, drain connections and release the certificate
    /// binding. Safe to call at any time, any number of times.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;

        if let Some(running) = lifecycle.running.take() {
            tracing::info!("Server stopping");
            self.addrs.store(None);
            running.shutdown.trigger();
            for task in running.tasks {
                if let Err(e) = task.await {
                    tracing::error!(error = %e, "Accept loop terminated abnormally");
                }
            }
            self.drain().await;
            tracing::info!("Server stopped");
        }

        if let Some(binding) = &lifecycle.binding {
            release_logged(binding);
        }
    }

    /// Start, wait for `signal`, then stop.
    pub async fn run_until<F>(&self, signal: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;
        signal.await;
        self.stop().await;
        Ok(())
    }

    async fn drain(&self) {
        let deadline = Instant::now() + Duration::from_secs(self.config.listener.drain_secs);
        while self.tracker.active_count() > 0 {
            if Instant::now() >= deadline {
                tracing::warn!(
                    active_connections = self.tracker.active_count(),
                    "Drain deadline passed with connections still open"
                );
                return;
            }
            tokio::time::sleep(DRAIN_POLL).await;
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("addrs", &self.addrs.load_full())
            .finish_non_exhaustive()
    }
}

fn parse_addr(address: &str) -> Result<SocketAddr, ServerError> {
    address
        .parse()
        .map_err(|_| ServerError::InvalidAddress(address.to_string()))
}

fn listen_error(err: ListenerError) -> ServerError {
    match err {
        ListenerError::Bind { addr, source } => ServerError::Listen { addr, source },
        other => ServerError::Listen {
            addr: SocketAddr::from(([0, 0, 0, 0], 0)),
            source: std::io::Error::other(other.to_string()),
        },
    }
}

fn release_logged(binding: &CertificateBinding) {
    if let Err(e) = binding.release() {
        tracing::warn!(endpoint = %binding.endpoint(), error = %e, "Certificate release failed");
    }
}

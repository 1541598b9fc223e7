//! Route registry: dynamic routes, WebSocket routes, host roots and mounts.
//!
//! # Responsibilities
//! - Validate registrations synchronously (path syntax, root directories)
//! - Publish an immutable `RouteTable` snapshot after every registration
//! - Answer lookups with exact-host-then-wildcard fallback
//!
//! # Design Decisions
//! - Copy-on-write through `ArcSwap`: readers never block and never see a
//!   half-applied registration, even if registration races early traffic
//! - Last registration of a key wins
//! - No unregister operation; entries live as long as the server

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use arc_swap::ArcSwap;
use axum::http::Method;

use crate::config::WILDCARD_HOST;
use crate::error::ConfigurationError;
use crate::http::handler::{Handler, SharedHandler};
use crate::routing::key::{normalize_host, registration_host, registration_path, RouteKey, WsRouteKey};
use crate::routing::mount::{insert_mount, DocumentRoot, StaticMount};
use crate::websocket::upgrade::{SharedSocketHandler, SocketHandler};

/// Immutable snapshot of every registration.
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: HashMap<RouteKey, SharedHandler>,
    sockets: HashMap<WsRouteKey, SharedSocketHandler>,
    host_roots: HashMap<String, Arc<DocumentRoot>>,
    mounts: Vec<StaticMount>,
}

impl RouteTable {
    /// Dynamic handler for `method` on `host` + `path`, falling back to the
    /// wildcard host.
    pub fn route(&self, method: &Method, host: &str, path: &str) -> Option<SharedHandler> {
        let key = RouteKey::new(method.clone(), host, path);
        self.routes
            .get(&key)
            .or_else(|| self.routes.get(&key.wildcard()))
            .cloned()
    }

    /// WebSocket handler for `host` + `path`, falling back to the wildcard host.
    pub fn websocket(&self, host: &str, path: &str) -> Option<SharedSocketHandler> {
        let key = WsRouteKey::new(host, path);
        self.sockets
            .get(&key)
            .or_else(|| self.sockets.get(&key.wildcard()))
            .cloned()
    }

    /// Document root of `host`, falling back to the wildcard host.
    pub fn host_root(&self, host: &str) -> Option<Arc<DocumentRoot>> {
        self.host_roots
            .get(&normalize_host(host))
            .or_else(|| self.host_roots.get(WILDCARD_HOST))
            .cloned()
    }

    /// Longest-prefix mount serving `path` on `host`, with the remainder of
    /// the path after the prefix.
    pub fn static_mount<'a>(&self, host: &str, path: &'a str) -> Option<(Arc<DocumentRoot>, &'a str)> {
        let host = normalize_host(host);
        self.mounts
            .iter()
            .find_map(|m| m.strip(&host, path).map(|rest| (Arc::clone(m.document()), rest)))
    }

    /// Mounts in resolution order.
    pub fn mounts(&self) -> &[StaticMount] {
        &self.mounts
    }

    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    pub fn websocket_count(&self) -> usize {
        self.sockets.len()
    }
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .field("sockets", &self.sockets.keys().collect::<Vec<_>>())
            .field("host_roots", &self.host_roots)
            .field("mounts", &self.mounts)
            .finish()
    }
}

/// Registration surface shared between configuration code and dispatch.
#[derive(Debug, Default)]
pub struct Registry {
    table: ArcSwap<RouteTable>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot. Hold it for the duration of one request.
    pub fn snapshot(&self) -> Arc<RouteTable> {
        self.table.load_full()
    }

    /// Register a dynamic handler for an exact (method, host, path).
    pub fn register_route<H: Handler>(
        &self,
        host: &str,
        method: Method,
        path: &str,
        handler: H,
    ) -> Result<(), ConfigurationError> {
        let host = registration_host(host)?;
        let path = registration_path(path)?;
        let key = RouteKey { method, host, path };
        let handler: SharedHandler = Arc::new(handler);
        tracing::info!(method = %key.method, host = %key.host, path = %key.path, "Route registered");
        self.update(|table| {
            table.routes.insert(key.clone(), Arc::clone(&handler));
        });
        Ok(())
    }

    /// Register a WebSocket handler for an exact (host, path).
    pub fn register_websocket<H: SocketHandler>(
        &self,
        host: &str,
        path: &str,
        handler: H,
    ) -> Result<(), ConfigurationError> {
        let host = registration_host(host)?;
        let path = registration_path(path)?;
        let key = WsRouteKey { host, path };
        let handler: SharedSocketHandler = Arc::new(handler);
        tracing::info!(host = %key.host, path = %key.path, "WebSocket route registered");
        self.update(|table| {
            table.sockets.insert(key.clone(), Arc::clone(&handler));
        });
        Ok(())
    }

    /// Mount `root` under the URL `prefix` on `host`.
    pub fn register_static_mount(
        &self,
        host: &str,
        prefix: &str,
        root: impl AsRef<Path>,
        browsable: bool,
    ) -> Result<(), ConfigurationError> {
        let host = registration_host(host)?;
        let prefix = registration_path(prefix)?;
        let document = DocumentRoot::resolve(root, browsable)?;
        tracing::info!(
            host = %host,
            prefix = %prefix,
            root = %document.root().display(),
            browsable,
            "Static mount registered"
        );
        let mount = StaticMount::new(host, &prefix, document);
        self.update(|table| insert_mount(&mut table.mounts, mount.clone()));
        Ok(())
    }

    /// Serve `root` for every path on `host`.
    pub fn register_host_root(
        &self,
        host: &str,
        root: impl AsRef<Path>,
        browsable: bool,
    ) -> Result<(), ConfigurationError> {
        let host = registration_host(host)?;
        let document = Arc::new(DocumentRoot::resolve(root, browsable)?);
        tracing::info!(
            host = %host,
            root = %document.root().display(),
            browsable,
            "Host root registered"
        );
        self.update(|table| {
            table.host_roots.insert(host.clone(), Arc::clone(&document));
        });
        Ok(())
    }

    fn update(&self, apply: impl Fn(&mut RouteTable)) {
        self.table.rcu(|current| {
            let mut next = RouteTable::clone(current);
            apply(&mut next);
            next
        });
    }
}

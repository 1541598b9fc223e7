//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use serde::{Deserialize, Serialize};

/// Wildcard host, matched only after an exact host lookup misses.
pub const WILDCARD_HOST: &str = "*";

/// Root configuration for the server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (plaintext + optional TLS).
    pub listener: ListenerConfig,

    /// Whole-host document roots.
    pub host_roots: Vec<HostRootConfig>,

    /// URL-prefix static mounts.
    pub static_mounts: Vec<StaticMountConfig>,

    /// Broadcast WebSocket endpoints.
    pub websocket_relays: Vec<RelayConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Plaintext bind address (e.g., "0.0.0.0:8080").
    pub http_address: String,

    /// Optional HTTPS listener.
    pub https: Option<HttpsConfig>,

    /// Maximum concurrent connections per listener (backpressure).
    pub max_connections: usize,

    /// Seconds an idle keep-alive connection may take to drain on stop.
    pub drain_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            http_address: "0.0.0.0:8080".to_string(),
            https: None,
            max_connections: 10_000,
            drain_secs: 10,
        }
    }
}

/// HTTPS listener and the certificate bound to it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpsConfig {
    /// Bind address (e.g., "0.0.0.0:8443").
    pub address: String,

    /// Certificate identity.
    pub certificate: CertificateConfig,
}

/// Certificate identity as understood by the binding service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CertificateConfig {
    /// Certificate hash (thumbprint).
    pub thumbprint: String,

    /// Certificate store name. For the rustls binding this is a directory
    /// holding `<thumbprint>.pem` and `<thumbprint>.key`.
    pub store: String,
}

/// Document root serving an entire virtual host.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostRootConfig {
    /// Host name, or `*`.
    #[serde(default = "default_host")]
    pub host: String,

    /// Physical directory.
    pub root: PathBuf,

    /// Render directory listings when no default document exists.
    #[serde(default)]
    pub browsable: bool,
}

/// Static directory mounted under a URL prefix.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticMountConfig {
    /// Host name, or `*`.
    #[serde(default = "default_host")]
    pub host: String,

    /// URL prefix, e.g. "/assets".
    pub prefix: String,

    /// Physical directory.
    pub root: PathBuf,

    /// Render directory listings when no default document exists.
    #[serde(default)]
    pub browsable: bool,
}

/// WebSocket endpoint that relays every message to all connected peers.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RelayConfig {
    /// Host name, or `*`.
    #[serde(default = "default_host")]
    pub host: String,

    /// Exact request path.
    pub path: String,

    /// Deliver a sender's message back to the sender as well.
    #[serde(default)]
    pub echo_to_sender: bool,
}

fn default_host() -> String {
    WILDCARD_HOST.to_string()
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.http_address, "0.0.0.0:8080");
        assert!(config.listener.https.is_none());
        assert!(config.static_mounts.is_empty());
        assert_eq!(config.observability.log_level, "info");
    }

    #[test]
    fn parses_mounts_and_https() {
        let config: ServerConfig = toml::from_str(
            r#"
            [listener]
            http_address = "127.0.0.1:8080"

            [listener.https]
            address = "127.0.0.1:8443"
            certificate = { thumbprint = "ab12", store = "/etc/hostgate/certs" }

            [[host_roots]]
            host = "docs.example"
            root = "/srv/docs"
            browsable = true

            [[static_mounts]]
            prefix = "/assets"
            root = "/srv/assets"

            [[websocket_relays]]
            path = "/chat"
            "#,
        )
        .unwrap();

        let https = config.listener.https.unwrap();
        assert_eq!(https.certificate.thumbprint, "ab12");
        assert_eq!(config.host_roots[0].host, "docs.example");
        assert!(config.host_roots[0].browsable);
        assert_eq!(config.static_mounts[0].host, WILDCARD_HOST);
        assert!(!config.static_mounts[0].browsable);
        assert!(!config.websocket_relays[0].echo_to_sender);
    }
}

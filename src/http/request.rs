//! Request inspection.
//!
//! # Responsibilities
//! - Extract the routing target (host, path) from an inbound request
//! - Carry the request ID assigned by the tower-http layer into logs
//! - Detect WebSocket upgrade requests
//!
//! # Design Decisions
//! - `Host` header first, URI authority second (HTTP/2 style requests);
//!   a request with neither routes only to wildcard registrations

use axum::http::{header, HeaderMap, Request};

/// Header carrying the per-request correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Routing-relevant view of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    pub host: String,
    pub path: String,
    pub request_id: String,
}

impl RequestTarget {
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let host = request
            .headers()
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| request.uri().authority().map(|a| a.as_str()))
            .unwrap_or_default()
            .to_string();

        let request_id = request
            .headers()
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        Self {
            host,
            path: request.uri().path().to_string(),
            request_id,
        }
    }

    /// Path with its leading slash removed, as used for host roots.
    pub fn relative_path(&self) -> &str {
        self.path.strip_prefix('/').unwrap_or(&self.path)
    }
}

/// `Connection: upgrade` together with `Upgrade: websocket`.
pub fn is_websocket_upgrade(headers: &HeaderMap) -> bool {
    let connection_upgrade = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));

    let upgrade_websocket = headers
        .get(header::UPGRADE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("websocket"));

    connection_upgrade && upgrade_websocket
}

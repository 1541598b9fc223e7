//! Lookup keys for dynamic and WebSocket routes.
//!
//! # Design Decisions
//! - Host matching is case-insensitive (RFC 9110), hosts are stored
//!   lowercased with any `:port` suffix removed
//! - Path matching is exact and case-sensitive
//! - No pattern or parameter matching

use axum::http::Method;
use crate::config::WILDCARD_HOST;
use crate::error::ConfigurationError;

/// Normalize a host for table keys and lookups.
///
/// Lowercases, trims whitespace and drops a trailing `:port`. IPv6 literals
/// keep their brackets.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim();
    let without_port = if host.starts_with('[') {
        match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        }
    } else {
        match host.rsplit_once(':') {
            Some((name, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => name,
            _ => host,
        }
    };
    without_port.to_ascii_lowercase()
}

/// Host as given at registration time, normalized and checked.
pub(crate) fn registration_host(host: &str) -> Result<String, ConfigurationError> {
    let host = normalize_host(host);
    if host.is_empty() {
        return Err(ConfigurationError::EmptyHost);
    }
    Ok(host)
}

/// Paths handed to registration must be absolute URL paths.
pub(crate) fn registration_path(path: &str) -> Result<String, ConfigurationError> {
    if !path.starts_with('/') {
        return Err(ConfigurationError::InvalidPath(path.to_string()));
    }
    Ok(path.to_string())
}

/// Key of a dynamic route: one exact URL on one host for one method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub method: Method,
    pub host: String,
    pub path: String,
}

impl RouteKey {
    pub fn new(method: Method, host: &str, path: &str) -> Self {
        Self {
            method,
            host: normalize_host(host),
            path: path.to_string(),
        }
    }

    /// Same method and path on the wildcard host.
    pub fn wildcard(&self) -> Self {
        Self {
            method: self.method.clone(),
            host: WILDCARD_HOST.to_string(),
            path: self.path.clone(),
        }
    }
}

/// Key of a WebSocket route; WebSocket routes have no method dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WsRouteKey {
    pub host: String,
    pub path: String,
}

impl WsRouteKey {
    pub fn new(host: &str, path: &str) -> Self {
        Self {
            host: normalize_host(host),
            path: path.to_string(),
        }
    }

    pub fn wildcard(&self) -> Self {
        Self {
            host: WILDCARD_HOST.to_string(),
            path: self.path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_normalization() {
        assert_eq!(normalize_host("App.Example:8080"), "app.example");
        assert_eq!(normalize_host("APP.example"), "app.example");
        assert_eq!(normalize_host("[::1]:443"), "[::1]");
        assert_eq!(normalize_host("*"), "*");
        assert_eq!(normalize_host("host:"), "host:");
    }

    #[test]
    fn keys_compare_hosts_case_insensitively() {
        let a = RouteKey::new(Method::GET, "Example.COM", "/x");
        let b = RouteKey::new(Method::GET, "example.com:80", "/x");
        assert_eq!(a, b);
        assert_ne!(a, RouteKey::new(Method::GET, "example.com", "/X"));
        assert_eq!(a.wildcard().host, "*");
    }

    #[test]
    fn registration_rejects_relative_paths() {
        assert!(registration_path("/ok").is_ok());
        assert!(matches!(
            registration_path("relative"),
            Err(ConfigurationError::InvalidPath(_))
        ));
        assert!(matches!(registration_host("  "), Err(ConfigurationError::EmptyHost)));
    }
}

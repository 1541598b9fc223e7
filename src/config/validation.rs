//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, path syntax and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Root directories are checked later, at registration time, where the
//!   registry resolves them to absolute paths

use std::fmt;
use std::net::SocketAddr;
use crate::config::schema::ServerConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.http_address", &config.listener.http_address);
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be greater than 0"));
    }
    if let Some(https) = &config.listener.https {
        check_address(&mut errors, "listener.https.address", &https.address);
        if https.certificate.thumbprint.trim().is_empty() {
            errors.push(ValidationError::new(
                "listener.https.certificate.thumbprint",
                "must not be empty",
            ));
        }
        if https.certificate.store.trim().is_empty() {
            errors.push(ValidationError::new(
                "listener.https.certificate.store",
                "must not be empty",
            ));
        }
    }

    for (i, root) in config.host_roots.iter().enumerate() {
        check_host(&mut errors, &format!("host_roots[{i}].host"), &root.host);
    }
    for (i, mount) in config.static_mounts.iter().enumerate() {
        check_host(&mut errors, &format!("static_mounts[{i}].host"), &mount.host);
        check_path(&mut errors, &format!("static_mounts[{i}].prefix"), &mount.prefix);
    }
    for (i, relay) in config.websocket_relays.iter().enumerate() {
        check_host(&mut errors, &format!("websocket_relays[{i}].host"), &relay.host);
        check_path(&mut errors, &format!("websocket_relays[{i}].path"), &relay.path);
    }

    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(field, format!("{value:?} is not a socket address")));
    }
}

fn check_host(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ValidationError::new(field, "must not be empty (use \"*\" for any host)"));
    }
}

fn check_path(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if !value.starts_with('/') {
        errors.push(ValidationError::new(field, format!("{value:?} must start with '/'")));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{StaticMountConfig, RelayConfig};

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&ServerConfig::default()).is_ok());
    }

    #[test]
    fn collects_all_errors() {
        let mut config = ServerConfig::default();
        config.listener.http_address = "localhost".into();
        config.static_mounts.push(StaticMountConfig {
            host: "".into(),
            prefix: "assets".into(),
            root: "/tmp".into(),
            browsable: false,
        });
        config.websocket_relays.push(RelayConfig {
            host: "*".into(),
            path: "chat".into(),
            echo_to_sender: false,
        });

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "listener.http_address",
                "static_mounts[0].host",
                "static_mounts[0].prefix",
                "websocket_relays[0].path",
            ]
        );
    }
}

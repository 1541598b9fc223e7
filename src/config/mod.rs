//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → Server::from_config registers host roots, mounts and relays
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no live reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CertificateConfig, HostRootConfig, HttpsConfig, ListenerConfig, ObservabilityConfig,
    RelayConfig, ServerConfig, StaticMountConfig, WILDCARD_HOST,
};

//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher, accept loops, WebSocket sessions, binding lifecycle
//!     → logging.rs (tracing events, EnvFilter, fmt to stdout)
//!     → metrics.rs (request counts and latency, live connections, faults)
//!
//! Prometheus scrape endpoint, only when observability.metrics_enabled
//! ```
//!
//! # Design Decisions
//! - `x-request-id` is assigned by tower-http and repeated in every
//!   dispatcher log line about that request
//! - Without an installed recorder, metric calls are no-ops

pub mod logging;
pub mod metrics;

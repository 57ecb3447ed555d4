//! # Observability
//!
//! Prometheus metrics for the provisioner. Logging goes through `tracing`
//! and is initialized in `main.rs`.

pub mod metrics;

pub use metrics::*;

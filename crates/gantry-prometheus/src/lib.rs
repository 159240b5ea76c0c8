//! Prometheus metrics backend for the deployment pipeline.
//!
//! ```rust
//! use std::sync::Arc;
//! use gantry_core::metrics::MetricsHandle;
//! use gantry_prometheus::PrometheusMetrics;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = PrometheusMetrics::new()?;
//! let handle: MetricsHandle = Arc::new(metrics.clone());
//! // hand `handle` to the Deployer and the client, run, then:
//! let text = metrics.encode_text()?;
//! # let _ = (handle, text);
//! # Ok(())
//! # }
//! ```
//!
//! The deployer is a one-shot process, so there is no `/metrics` endpoint: the binary
//! writes [`PrometheusMetrics::encode_text`] to a file for a node-exporter textfile
//! collector or a CI artifact.
mod backend;
pub use backend::PrometheusMetrics;

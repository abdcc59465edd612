//! datagate Telemetry - Observability Infrastructure
//!
//! Structured logging through `tracing` and Prometheus metrics registered in
//! the default registry. Exposing the registry is left to the embedding
//! service.

pub mod metrics;
pub mod tracer;

pub use metrics::{metrics, GatewayMetrics, METRICS};
pub use tracer::{init_tracing, LogFormat, TelemetryConfig};

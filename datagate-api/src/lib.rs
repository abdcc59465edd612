//! datagate API - Result-Serving and Job-Admission Gateway
//!
//! For each request naming a resource (a dataset plus optional config and
//! split, for one processing step) the gateway either serves the cached
//! result, propagates a failure the pipeline recorded, or makes sure a job
//! is queued to compute it and answers "not ready".
//!
//! Routing and the server process belong to the embedding service: it builds
//! an [`AppState`] and calls [`AppState::respond`] from its handlers.

pub mod admission;
pub mod config;
pub mod constants;
pub mod error;
pub mod orchestrator;
pub mod resolver;
pub mod response;
pub mod state;
pub mod telemetry;
pub mod validation;

mod store_call;

pub use admission::AdmissionController;
pub use config::{EndpointConfig, GatewayConfig, RetryAfterPolicy};
pub use error::{ApiError, ApiResult, ErrorBody, ErrorCode};
pub use orchestrator::{OrchestratorConfig, ResponseOrchestrator};
pub use resolver::{RawParams, ResourceResolver};
pub use response::ResponsePolicy;
pub use state::AppState;

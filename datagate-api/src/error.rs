//! Error Types for the datagate API
//!
//! This module defines error handling for the gateway layer, including:
//! - ErrorCode enum naming every error the gateway itself produces
//! - ApiError struct for structured error responses
//! - ErrorBody, the JSON shape shared with stored upstream errors
//! - IntoResponse implementation for Axum HTTP responses
//!
//! Errors recorded by the computation pipeline keep their own codes and are
//! rendered by [`crate::response`]; they never become an [`ErrorCode`].

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use datagate_core::{ConfigError, DatagateError, ResolveError, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::ERROR_CODE_HEADER;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes the gateway emits in the `X-Error-Code` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub enum ErrorCode {
    // ========================================================================
    // Invalid Requests (422)
    // ========================================================================
    /// A required parameter is absent or empty
    MissingField,

    /// A parameter is present but not a valid name
    MalformedField,

    /// No processing step serves this endpoint
    UnknownEndpoint,

    /// The endpoint names a step missing from the processing graph
    UnknownStep,

    // ========================================================================
    // Not Ready (500)
    // ========================================================================
    /// The result is being computed
    ResponseNotReady,

    // ========================================================================
    // Transient Infrastructure (503, 504)
    // ========================================================================
    /// Cache store or job queue refused the call
    StoreUnavailable,

    /// Cache store or job queue did not answer in time
    StoreTimeout,

    // ========================================================================
    // Capacity (429)
    // ========================================================================
    /// The job queue is full
    CapacityRejected,

    // ========================================================================
    // Server Errors (500)
    // ========================================================================
    /// Gateway configuration is invalid
    InvalidConfig,

    /// Internal server error
    InternalError,
}

impl ErrorCode {
    /// Default HTTP status for this code. The response policy may override
    /// the configurable ones.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::MissingField
            | ErrorCode::MalformedField
            | ErrorCode::UnknownEndpoint
            | ErrorCode::UnknownStep => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::StoreUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::StoreTimeout => StatusCode::GATEWAY_TIMEOUT,
            ErrorCode::CapacityRejected => StatusCode::TOO_MANY_REQUESTS,
            ErrorCode::ResponseNotReady | ErrorCode::InvalidConfig | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get a default message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::MissingField => "Parameter is required",
            ErrorCode::MalformedField => "Parameter is malformed",
            ErrorCode::UnknownEndpoint => "Unknown endpoint",
            ErrorCode::UnknownStep => "Unknown processing step",
            ErrorCode::ResponseNotReady => "The response is not ready yet. Please retry later.",
            ErrorCode::StoreUnavailable => "A backing store is unavailable. Please retry later.",
            ErrorCode::StoreTimeout => "A backing store timed out. Please retry later.",
            ErrorCode::CapacityRejected => {
                "The job queue is at capacity and cannot accept new work. Please retry later."
            }
            ErrorCode::InvalidConfig => "Invalid gateway configuration",
            ErrorCode::InternalError => "Unexpected error.",
        }
    }

    /// The code as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingField => "MissingField",
            ErrorCode::MalformedField => "MalformedField",
            ErrorCode::UnknownEndpoint => "UnknownEndpoint",
            ErrorCode::UnknownStep => "UnknownStep",
            ErrorCode::ResponseNotReady => "ResponseNotReady",
            ErrorCode::StoreUnavailable => "StoreUnavailable",
            ErrorCode::StoreTimeout => "StoreTimeout",
            ErrorCode::CapacityRejected => "CapacityRejected",
            ErrorCode::InvalidConfig => "InvalidConfig",
            ErrorCode::InternalError => "InternalError",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error produced by the gateway itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ApiError {
    /// Error code categorizing the error
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create a new API error with the given code, using the default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    /// Add additional details to the error.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        self.code.status_code()
    }

    // ========================================================================
    // Convenience constructors for common errors
    // ========================================================================

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingField,
            format!("Parameter '{}' is required", field),
        )
    }

    pub fn malformed_field(field: &str, reason: &str) -> Self {
        Self::new(
            ErrorCode::MalformedField,
            format!("Parameter '{}' is malformed: {}", field, reason),
        )
    }

    pub fn not_ready() -> Self {
        Self::from_code(ErrorCode::ResponseNotReady)
    }

    pub fn capacity_rejected() -> Self {
        Self::from_code(ErrorCode::CapacityRejected)
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfig, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// The JSON body sent to clients.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.message.clone(),
            code: self.code.as_str().to_string(),
            details: self.details.clone(),
        }
    }

    /// Render with an explicit status, keeping the body and code header.
    pub fn into_response_with_status(self, status: StatusCode) -> Response {
        error_response(status, self.code.as_str(), self.body())
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        self.into_response_with_status(status)
    }
}

// ============================================================================
// WIRE BODY
// ============================================================================

/// JSON body of every error response, whether the gateway or the pipeline
/// produced the error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct ErrorBody {
    /// Human-readable error message
    pub error: String,

    /// Machine-readable code, mirrored in the `X-Error-Code` header
    pub code: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[cfg_attr(feature = "openapi", schema(value_type = Option<Object>))]
    pub details: Option<serde_json::Value>,
}

/// Build an error response carrying `code` in the `X-Error-Code` header.
pub(crate) fn error_response(status: StatusCode, code: &str, body: ErrorBody) -> Response {
    let mut response = (status, Json(body)).into_response();
    match HeaderValue::from_str(code) {
        Ok(value) => {
            response.headers_mut().insert(ERROR_CODE_HEADER, value);
        }
        Err(_) => {
            tracing::warn!(code, "error code is not a valid header value");
        }
    }
    response
}

// ============================================================================
// CONVERSIONS FROM DOMAIN ERRORS
// ============================================================================

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        match &err {
            ResolveError::MissingField { field } => ApiError::missing_field(field),
            ResolveError::MalformedField { field, reason } => {
                ApiError::malformed_field(field, reason)
            }
            ResolveError::UnknownEndpoint { .. } => {
                ApiError::new(ErrorCode::UnknownEndpoint, err.to_string())
            }
            ResolveError::UnknownStep { .. } => ApiError::new(ErrorCode::UnknownStep, err.to_string()),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        tracing::warn!(store = err.store().as_str(), error = %err, "store error");
        let code = if err.is_timeout() {
            ErrorCode::StoreTimeout
        } else {
            ErrorCode::StoreUnavailable
        };
        ApiError::from_code(code)
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::invalid_config(err.to_string())
    }
}

impl From<DatagateError> for ApiError {
    fn from(err: DatagateError) -> Self {
        match err {
            DatagateError::Store(e) => e.into(),
            DatagateError::Resolve(e) => e.into(),
            DatagateError::Config(e) => e.into(),
        }
    }
}

// ============================================================================
// RESULT TYPE ALIAS
// ============================================================================

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use datagate_core::StoreKind;
    use std::time::Duration;

    #[test]
    fn test_error_code_status_mapping() {
        assert_eq!(
            ErrorCode::MissingField.status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::ResponseNotReady.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ErrorCode::StoreUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(ErrorCode::StoreTimeout.status_code(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            ErrorCode::CapacityRejected.status_code(),
            StatusCode::TOO_MANY_REQUESTS
        );
    }

    #[test]
    fn test_error_code_serializes_as_wire_code() -> Result<(), serde_json::Error> {
        assert_eq!(
            serde_json::to_string(&ErrorCode::ResponseNotReady)?,
            "\"ResponseNotReady\""
        );
        assert_eq!(ErrorCode::ResponseNotReady.to_string(), "ResponseNotReady");
        Ok(())
    }

    #[test]
    fn test_from_resolve_error() {
        let err: ApiError = ResolveError::missing("dataset").into();
        assert_eq!(err.code, ErrorCode::MissingField);
        assert!(err.message.contains("dataset"));

        let err: ApiError = ResolveError::malformed("split", "contains '/'").into();
        assert_eq!(err.code, ErrorCode::MalformedField);
        assert_eq!(err.message, "Parameter 'split' is malformed: contains '/'");

        let err: ApiError = ResolveError::UnknownEndpoint {
            endpoint: "/nope".to_string(),
        }
        .into();
        assert_eq!(err.code, ErrorCode::UnknownEndpoint);
    }

    #[test]
    fn test_from_store_error_hides_internals() {
        let err: ApiError = StoreError::unavailable(StoreKind::Queue, "10.0.0.3 refused").into();
        assert_eq!(err.code, ErrorCode::StoreUnavailable);
        assert!(!err.message.contains("10.0.0.3"));

        let err: ApiError =
            StoreError::timeout(StoreKind::Cache, "get", Duration::from_millis(5)).into();
        assert_eq!(err.code, ErrorCode::StoreTimeout);
    }

    #[test]
    fn test_into_response_sets_code_header() {
        let response = ApiError::missing_field("dataset").into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            response
                .headers()
                .get(ERROR_CODE_HEADER)
                .and_then(|v| v.to_str().ok()),
            Some("MissingField")
        );
    }

    #[test]
    fn test_body_shape() -> Result<(), serde_json::Error> {
        let body = ApiError::not_ready().body();
        let value = serde_json::to_value(&body)?;
        assert_eq!(value["code"], "ResponseNotReady");
        assert!(value.get("details").is_none());
        Ok(())
    }
}

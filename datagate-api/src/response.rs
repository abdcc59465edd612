//! Outcome-to-response mapping.
//!
//! | Outcome | Status | Extra headers |
//! |---|---|---|
//! | Hit | 200 | `Cache-Control: max-age=<long>` |
//! | Pending | `pending_status` (500) | `Retry-After`, `Cache-Control: max-age=<short>` |
//! | Upstream error | stored 4xx/5xx, else 500 | `Cache-Control: max-age=<short>` |
//! | Transient error | 503, or 504 on timeout | `Retry-After`, `Cache-Control: no-store` |
//! | Capacity rejected | `capacity_status` (429) | `Retry-After`, `Cache-Control: no-store` |
//! | Invalid request | `invalid_request_status` (422) | |
//!
//! Every non-200 response carries `X-Error-Code` and an [`ErrorBody`].

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::time::Duration;

use datagate_core::{ConfigError, Failure, FailureClass, Outcome};

use crate::constants::*;
use crate::error::{error_response, ApiError, ErrorBody, ErrorCode};

/// Status codes and cache lifetimes applied when rendering outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponsePolicy {
    pub pending_status: u16,
    pub capacity_status: u16,
    pub invalid_request_status: u16,
    pub max_age_long: Duration,
    pub max_age_short: Duration,
}

impl Default for ResponsePolicy {
    fn default() -> Self {
        Self {
            pending_status: DEFAULT_PENDING_STATUS,
            capacity_status: DEFAULT_CAPACITY_STATUS,
            invalid_request_status: DEFAULT_INVALID_REQUEST_STATUS,
            max_age_long: Duration::from_secs(DEFAULT_MAX_AGE_LONG_SECS),
            max_age_short: Duration::from_secs(DEFAULT_MAX_AGE_SHORT_SECS),
        }
    }
}

impl ResponsePolicy {
    /// Every configured status must be a valid HTTP status.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, status) in [
            ("DATAGATE_PENDING_STATUS", self.pending_status),
            ("DATAGATE_CAPACITY_STATUS", self.capacity_status),
            ("DATAGATE_INVALID_REQUEST_STATUS", self.invalid_request_status),
        ] {
            parse_status(status).ok_or_else(|| ConfigError::InvalidValue {
                field: field.to_string(),
                value: status.to_string(),
                reason: "not an HTTP status code".to_string(),
            })?;
        }
        Ok(())
    }

    /// Render an outcome as an HTTP response.
    pub fn render(&self, outcome: Outcome) -> Response {
        match outcome {
            Outcome::Hit(hit) => {
                let mut response = (StatusCode::OK, Json(hit.payload)).into_response();
                set_max_age(&mut response, self.max_age_long);
                response
            }
            Outcome::Pending { retry_after, .. } => {
                let status = self.status_or(self.pending_status, ErrorCode::ResponseNotReady);
                let mut response = ApiError::not_ready().into_response_with_status(status);
                set_retry_after(&mut response, retry_after);
                set_max_age(&mut response, self.max_age_short);
                response
            }
            Outcome::Error(failure) => self.render_failure(failure),
            Outcome::InvalidRequest(err) => {
                let error = ApiError::from(err);
                let status = self.status_or(self.invalid_request_status, error.code);
                error.into_response_with_status(status)
            }
        }
    }

    fn render_failure(&self, failure: Failure) -> Response {
        let retry_after = failure.retry_after;
        let mut response = match failure.class {
            FailureClass::Upstream => {
                let status = failure
                    .http_status
                    .filter(|status| (400..=599).contains(status))
                    .and_then(parse_status)
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                let code = failure.code.clone();
                let mut response = error_response(
                    status,
                    &code,
                    ErrorBody {
                        error: failure.message,
                        code: failure.code,
                        details: failure.details,
                    },
                );
                set_max_age(&mut response, self.max_age_short);
                return response;
            }
            FailureClass::TransientInfra => {
                let code = if failure.is_timeout() {
                    ErrorCode::StoreTimeout
                } else {
                    ErrorCode::StoreUnavailable
                };
                ApiError::from_code(code).into_response()
            }
            FailureClass::CapacityRejected => {
                let status = self.status_or(self.capacity_status, ErrorCode::CapacityRejected);
                ApiError::capacity_rejected().into_response_with_status(status)
            }
        };
        if let Some(retry_after) = retry_after {
            set_retry_after(&mut response, retry_after);
        }
        response
            .headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        response
    }

    /// The configured status, or the code's default if it is not valid.
    fn status_or(&self, configured: u16, code: ErrorCode) -> StatusCode {
        parse_status(configured).unwrap_or_else(|| code.status_code())
    }
}

fn parse_status(status: u16) -> Option<StatusCode> {
    StatusCode::from_u16(status).ok()
}

/// Whole seconds, rounded up.
fn header_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

fn set_retry_after(response: &mut Response, retry_after: Duration) {
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from(header_secs(retry_after)));
}

fn set_max_age(response: &mut Response, max_age: Duration) {
    let value = format!("max-age={}", max_age.as_secs());
    if let Ok(value) = HeaderValue::from_str(&value) {
        response.headers_mut().insert(header::CACHE_CONTROL, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datagate_core::{
        Admission, CachedPayload, ErrorDetail, ResolveError, StoreError, StoreKind,
    };
    use serde_json::json;

    fn header<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
        response.headers().get(name).and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_hit() {
        let response = ResponsePolicy::default().render(Outcome::Hit(CachedPayload {
            step: "/splits".to_string(),
            payload: json!({"splits": []}),
            version: None,
            written_at: chrono::Utc::now(),
        }));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header(&response, "cache-control"), Some("max-age=120"));
        assert!(header(&response, ERROR_CODE_HEADER).is_none());
    }

    #[test]
    fn test_pending() {
        let response = ResponsePolicy::default().render(Outcome::Pending {
            retry_after: Duration::from_millis(2500),
            admission: Admission::NewlyQueued,
        });
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(header(&response, ERROR_CODE_HEADER), Some("ResponseNotReady"));
        assert_eq!(header(&response, "retry-after"), Some("3"));
        assert_eq!(header(&response, "cache-control"), Some("max-age=10"));
    }

    #[test]
    fn test_pending_status_is_configurable() {
        let policy = ResponsePolicy {
            pending_status: 202,
            ..ResponsePolicy::default()
        };
        let response = policy.render(Outcome::Pending {
            retry_after: Duration::from_secs(1),
            admission: Admission::AlreadyQueued,
        });
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[test]
    fn test_upstream_status_passthrough() {
        let detail = ErrorDetail::new("DatasetNotFoundError", "missing").with_http_status(404);
        let response =
            ResponsePolicy::default().render(Outcome::Error(Failure::upstream(&detail)));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(header(&response, ERROR_CODE_HEADER), Some("DatasetNotFoundError"));
        assert!(header(&response, "retry-after").is_none());

        let detail = ErrorDetail::new("Weird", "odd").with_http_status(200);
        let response =
            ResponsePolicy::default().render(Outcome::Error(Failure::upstream(&detail)));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_transient() {
        let timeout = StoreError::timeout(StoreKind::Cache, "get", Duration::from_secs(2));
        let response = ResponsePolicy::default().render(Outcome::Error(Failure::transient(
            &timeout,
            Duration::from_secs(5),
        )));
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(header(&response, "retry-after"), Some("5"));
        assert_eq!(header(&response, "cache-control"), Some("no-store"));

        let down = StoreError::unavailable(StoreKind::Queue, "refused");
        let response = ResponsePolicy::default().render(Outcome::Error(Failure::transient(
            &down,
            Duration::from_secs(5),
        )));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(header(&response, ERROR_CODE_HEADER), Some("StoreUnavailable"));
    }

    #[test]
    fn test_capacity_rejected() {
        let response = ResponsePolicy::default().render(Outcome::Error(
            Failure::capacity_rejected(Duration::from_secs(60)),
        ));
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(header(&response, "retry-after"), Some("60"));
        assert_eq!(header(&response, ERROR_CODE_HEADER), Some("CapacityRejected"));
    }

    #[test]
    fn test_invalid_request() {
        let response = ResponsePolicy::default()
            .render(Outcome::InvalidRequest(ResolveError::missing("dataset")));
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(header(&response, ERROR_CODE_HEADER), Some("MissingField"));
    }

    #[test]
    fn test_validate() {
        assert!(ResponsePolicy::default().validate().is_ok());
        let policy = ResponsePolicy {
            capacity_status: 42,
            ..ResponsePolicy::default()
        };
        assert!(policy.validate().is_err());
    }
}
